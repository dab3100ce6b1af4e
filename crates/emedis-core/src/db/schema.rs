//! SQLite schema definition.

/// Reference store schema.
///
/// Every table keeps a `position` column so rows come back in the order they
/// were imported; scoring tie-breaks depend on it.
pub const SCHEMA: &str = r#"
-- ============================================================================
-- Finding Dictionary
-- ============================================================================

CREATE TABLE IF NOT EXISTS finding_dictionary (
    position INTEGER PRIMARY KEY,
    phrase TEXT,
    canonical_text TEXT
);

-- ============================================================================
-- Disease Evidence
-- ============================================================================

CREATE TABLE IF NOT EXISTS disease_evidence (
    position INTEGER PRIMARY KEY,
    disease TEXT,
    finding_text TEXT,
    weight TEXT,                                 -- raw cell; NULL when absent
    citation_id TEXT
);

CREATE INDEX IF NOT EXISTS idx_evidence_disease ON disease_evidence(disease);

-- ============================================================================
-- Test Suggestions
-- ============================================================================

CREATE TABLE IF NOT EXISTS test_suggestions (
    position INTEGER PRIMARY KEY,
    disease TEXT NOT NULL DEFAULT '',
    test_name TEXT NOT NULL DEFAULT '',
    why TEXT NOT NULL DEFAULT ''
);

-- ============================================================================
-- Citations
-- ============================================================================

CREATE TABLE IF NOT EXISTS citations (
    position INTEGER PRIMARY KEY,
    citation_id TEXT NOT NULL DEFAULT '',
    title TEXT NOT NULL DEFAULT '',
    url TEXT NOT NULL DEFAULT '',
    source TEXT NOT NULL DEFAULT ''
);

-- ============================================================================
-- Import Metadata
-- ============================================================================

CREATE TABLE IF NOT EXISTS reference_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_schema_valid() {
        let conn = Connection::open_in_memory().unwrap();
        let result = conn.execute_batch(SCHEMA);
        assert!(result.is_ok(), "Schema should be valid SQL: {:?}", result);
    }

    #[test]
    fn test_evidence_allows_missing_cells() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();

        let result = conn.execute(
            "INSERT INTO disease_evidence (position, disease, finding_text, weight, citation_id)
             VALUES (1, 'Flu', NULL, 'n/a', NULL)",
            [],
        );
        assert!(result.is_ok());
    }

    #[test]
    fn test_position_is_unique() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();

        conn.execute(
            "INSERT INTO citations (position, citation_id) VALUES (1, 'C1')",
            [],
        )
        .unwrap();
        let result = conn.execute(
            "INSERT INTO citations (position, citation_id) VALUES (1, 'C2')",
            [],
        );
        assert!(result.is_err());
    }
}
