//! SQLite reference store.
//!
//! Holds the four reference tables so a deployment can ship one database file
//! instead of a directory of CSVs.

mod reference;
mod schema;

pub use reference::*;
pub use schema::*;

use rusqlite::{Connection, OpenFlags};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Database errors.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Reference store not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("No reference tables have been imported")]
    NotImported,
}

pub type DbResult<T> = Result<T, DbError>;

/// Database connection wrapper.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open database at path, creating if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    /// Open an existing database for reading only.
    ///
    /// Never creates the file, and skips schema setup.
    pub fn open_read_only<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(DbError::NotFound(path.to_path_buf()));
        }
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Ok(Self { conn })
    }

    /// Create in-memory database (for testing).
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    fn initialize(&self) -> DbResult<()> {
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Get raw connection (for advanced queries).
    pub fn conn(&self) -> &Connection {
        &self.conn
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_in_memory() {
        let db = Database::open_in_memory();
        assert!(db.is_ok());
    }

    #[test]
    fn test_schema_initialized() {
        let db = Database::open_in_memory().unwrap();

        let tables: Vec<String> = db
            .conn()
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect();

        for table in [
            "finding_dictionary",
            "disease_evidence",
            "test_suggestions",
            "citations",
            "reference_meta",
        ] {
            assert!(tables.contains(&table.to_string()), "missing table {}", table);
        }
    }

    #[test]
    fn test_reopen_file_keeps_schema() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reference.db");
        Database::open(&path).unwrap();
        // IF NOT EXISTS makes the schema idempotent
        assert!(Database::open(&path).is_ok());
    }

    #[test]
    fn test_read_only_open_never_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mistyped.db");

        let result = Database::open_read_only(&path);
        assert!(matches!(result, Err(DbError::NotFound(ref p)) if p == &path));
        assert!(!path.exists());
    }

    #[test]
    fn test_read_only_open_rejects_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reference.db");
        Database::open(&path).unwrap();

        let db = Database::open_read_only(&path).unwrap();
        let write = db
            .conn()
            .execute("INSERT INTO reference_meta (key, value) VALUES ('k', 'v')", []);
        assert!(write.is_err());
    }
}
