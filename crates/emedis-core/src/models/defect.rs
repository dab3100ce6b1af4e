//! Data-quality defects found in reference tables.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The reference table a defect was found in.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceTable {
    FindingDictionary,
    DiseaseEvidence,
    TestSuggestions,
    Citations,
}

impl ReferenceTable {
    /// Stable table name, matching the SQLite table names.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReferenceTable::FindingDictionary => "finding_dictionary",
            ReferenceTable::DiseaseEvidence => "disease_evidence",
            ReferenceTable::TestSuggestions => "test_suggestions",
            ReferenceTable::Citations => "citations",
        }
    }
}

/// What was wrong with the row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DefectKind {
    /// A required field was absent or blank
    MissingField { field: String },
    /// The weight cell could not be read as a number; 1 was used instead
    NonNumericWeight { raw: String },
}

/// A malformed reference row, recovered locally and reported to the caller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DataDefect {
    /// Table containing the row
    pub table: ReferenceTable,
    /// 1-based row number within the table (header excluded)
    pub row: usize,
    /// Defect description
    #[serde(flatten)]
    pub kind: DefectKind,
}

impl DataDefect {
    pub fn missing_field(table: ReferenceTable, row: usize, field: &str) -> Self {
        Self {
            table,
            row,
            kind: DefectKind::MissingField {
                field: field.to_string(),
            },
        }
    }

    pub fn non_numeric_weight(row: usize, raw: &str) -> Self {
        Self {
            table: ReferenceTable::DiseaseEvidence,
            row,
            kind: DefectKind::NonNumericWeight {
                raw: raw.to_string(),
            },
        }
    }
}

impl fmt::Display for DataDefect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            DefectKind::MissingField { field } => write!(
                f,
                "{} row {}: missing required field '{}'",
                self.table.as_str(),
                self.row,
                field
            ),
            DefectKind::NonNumericWeight { raw } => write!(
                f,
                "{} row {}: non-numeric weight '{}' treated as 1",
                self.table.as_str(),
                self.row,
                raw
            ),
        }
    }
}
