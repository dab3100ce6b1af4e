//! Reference table storage.

use rusqlite::{params, OptionalExtension};
use tracing::info;

use super::{Database, DbError, DbResult};
use crate::knowledge::ReferenceTables;
use crate::models::{Citation, DiseaseEvidenceRow, FindingDictionaryEntry, TestSuggestion, Weight};

const META_FINGERPRINT: &str = "fingerprint";
const META_IMPORTED_AT: &str = "imported_at";

impl Database {
    /// Replace all four reference tables in one transaction.
    ///
    /// Readers never observe a mix of old and new rows. Returns the
    /// fingerprint of the stored tables.
    pub fn replace_reference_tables(&mut self, tables: &ReferenceTables) -> DbResult<String> {
        let fingerprint = tables.fingerprint();
        let tx = self.conn.transaction()?;

        tx.execute_batch(
            r#"
            DELETE FROM finding_dictionary;
            DELETE FROM disease_evidence;
            DELETE FROM test_suggestions;
            DELETE FROM citations;
            "#,
        )?;

        {
            let mut stmt = tx.prepare(
                "INSERT INTO finding_dictionary (position, phrase, canonical_text) VALUES (?1, ?2, ?3)",
            )?;
            for (position, entry) in tables.dictionary.iter().enumerate() {
                stmt.execute(params![position as i64, entry.phrase, entry.canonical_text])?;
            }

            let mut stmt = tx.prepare(
                r#"
                INSERT INTO disease_evidence (position, disease, finding_text, weight, citation_id)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
            )?;
            for (position, row) in tables.evidence.iter().enumerate() {
                stmt.execute(params![
                    position as i64,
                    row.disease,
                    row.finding_text,
                    row.weight.to_raw(),
                    row.citation_id,
                ])?;
            }

            let mut stmt = tx.prepare(
                "INSERT INTO test_suggestions (position, disease, test_name, why) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for (position, test) in tables.tests.iter().enumerate() {
                stmt.execute(params![position as i64, test.disease, test.test_name, test.why])?;
            }

            let mut stmt = tx.prepare(
                r#"
                INSERT INTO citations (position, citation_id, title, url, source)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
            )?;
            for (position, citation) in tables.citations.iter().enumerate() {
                stmt.execute(params![
                    position as i64,
                    citation.citation_id,
                    citation.title,
                    citation.url,
                    citation.source,
                ])?;
            }

            let mut stmt = tx.prepare(
                r#"
                INSERT INTO reference_meta (key, value, updated_at) VALUES (?1, ?2, datetime('now'))
                ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = datetime('now')
                "#,
            )?;
            stmt.execute(params![META_FINGERPRINT, fingerprint])?;
            stmt.execute(params![META_IMPORTED_AT, chrono::Utc::now().to_rfc3339()])?;
        }

        tx.commit()?;

        info!(
            dictionary_rows = tables.dictionary.len(),
            evidence_rows = tables.evidence.len(),
            test_rows = tables.tests.len(),
            citation_rows = tables.citations.len(),
            fingerprint = %fingerprint,
            "Stored reference tables"
        );

        Ok(fingerprint)
    }

    /// Read all four reference tables back in import order.
    ///
    /// Fails with [`DbError::NotImported`] if nothing was ever stored, so an
    /// empty database is never mistaken for tables that match nothing.
    pub fn load_reference_tables(&self) -> DbResult<ReferenceTables> {
        if !self.has_meta_table()? || self.reference_fingerprint()?.is_none() {
            return Err(DbError::NotImported);
        }

        let mut stmt = self
            .conn
            .prepare("SELECT phrase, canonical_text FROM finding_dictionary ORDER BY position")?;
        let dictionary = stmt
            .query_map([], |row| {
                Ok(FindingDictionaryEntry {
                    phrase: row.get(0)?,
                    canonical_text: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut stmt = self.conn.prepare(
            "SELECT disease, finding_text, weight, citation_id FROM disease_evidence ORDER BY position",
        )?;
        let evidence = stmt
            .query_map([], |row| {
                let weight: Option<String> = row.get(2)?;
                Ok(DiseaseEvidenceRow {
                    disease: row.get(0)?,
                    finding_text: row.get(1)?,
                    weight: Weight::parse(weight.as_deref()),
                    citation_id: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut stmt = self
            .conn
            .prepare("SELECT disease, test_name, why FROM test_suggestions ORDER BY position")?;
        let tests = stmt
            .query_map([], |row| {
                Ok(TestSuggestion {
                    disease: row.get(0)?,
                    test_name: row.get(1)?,
                    why: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut stmt = self
            .conn
            .prepare("SELECT citation_id, title, url, source FROM citations ORDER BY position")?;
        let citations = stmt
            .query_map([], |row| {
                Ok(Citation {
                    citation_id: row.get(0)?,
                    title: row.get(1)?,
                    url: row.get(2)?,
                    source: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ReferenceTables {
            dictionary,
            evidence,
            tests,
            citations,
        })
    }

    /// Fingerprint recorded by the last import, if any.
    pub fn reference_fingerprint(&self) -> DbResult<Option<String>> {
        self.meta(META_FINGERPRINT)
    }

    /// RFC 3339 timestamp of the last import, if any.
    pub fn imported_at(&self) -> DbResult<Option<String>> {
        self.meta(META_IMPORTED_AT)
    }

    /// A read-only open skips schema setup, so a foreign SQLite file may lack it.
    fn has_meta_table(&self) -> DbResult<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'reference_meta'",
            [],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn meta(&self, key: &str) -> DbResult<Option<String>> {
        Ok(self
            .conn
            .query_row(
                "SELECT value FROM reference_meta WHERE key = ?",
                [key],
                |row| row.get(0),
            )
            .optional()?)
    }
}
