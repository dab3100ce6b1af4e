//! CSV loading for the reference tables.
//!
//! Expected layout under a data directory (paths are configurable):
//! - `data/symptoms_dict.csv`: phrase, canonical_text
//! - `data/disease_matrix.csv`: disease, finding_text, weight (optional), citation_id
//! - `data/tests_suggestions.csv`: disease, test_name, why
//! - `evidence/citations.csv`: citation_id, title, url, source
//!
//! Extra columns are ignored. A missing file or required column makes the
//! whole load fail; individual malformed rows are kept and reported later.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use super::ReferenceTables;

/// Reference table loading errors.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Reference table not found: {}", .0.display())]
    MissingFile(PathBuf),

    #[error("{} is missing required column '{column}'", path.display())]
    MissingColumn { path: PathBuf, column: String },

    #[error("CSV error in {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

pub type LoadResult<T> = Result<T, LoadError>;

/// Locations of the four tables relative to the data directory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TablePaths {
    #[serde(default = "default_dictionary_path")]
    pub finding_dictionary: PathBuf,
    #[serde(default = "default_evidence_path")]
    pub disease_evidence: PathBuf,
    #[serde(default = "default_tests_path")]
    pub test_suggestions: PathBuf,
    #[serde(default = "default_citations_path")]
    pub citations: PathBuf,
}

fn default_dictionary_path() -> PathBuf { PathBuf::from("data/symptoms_dict.csv") }
fn default_evidence_path() -> PathBuf { PathBuf::from("data/disease_matrix.csv") }
fn default_tests_path() -> PathBuf { PathBuf::from("data/tests_suggestions.csv") }
fn default_citations_path() -> PathBuf { PathBuf::from("evidence/citations.csv") }

impl Default for TablePaths {
    fn default() -> Self {
        Self {
            finding_dictionary: default_dictionary_path(),
            disease_evidence: default_evidence_path(),
            test_suggestions: default_tests_path(),
            citations: default_citations_path(),
        }
    }
}

const DICTIONARY_COLUMNS: &[&str] = &["phrase", "canonical_text"];
const EVIDENCE_COLUMNS: &[&str] = &["disease", "finding_text", "citation_id"];
const TEST_COLUMNS: &[&str] = &["disease", "test_name", "why"];
const CITATION_COLUMNS: &[&str] = &["citation_id", "title", "url", "source"];

impl ReferenceTables {
    /// Load all four tables from a data directory using the default layout.
    pub fn load_from_dir(data_dir: &Path) -> LoadResult<Self> {
        Self::load(data_dir, &TablePaths::default())
    }

    /// Load all four tables with explicit relative paths.
    pub fn load(data_dir: &Path, paths: &TablePaths) -> LoadResult<Self> {
        info!(data_dir = %data_dir.display(), "Loading reference tables");

        let tables = Self {
            dictionary: read_table(&data_dir.join(&paths.finding_dictionary), DICTIONARY_COLUMNS)?,
            evidence: read_table(&data_dir.join(&paths.disease_evidence), EVIDENCE_COLUMNS)?,
            tests: read_table(&data_dir.join(&paths.test_suggestions), TEST_COLUMNS)?,
            citations: read_table(&data_dir.join(&paths.citations), CITATION_COLUMNS)?,
        };

        info!(
            dictionary_rows = tables.dictionary.len(),
            evidence_rows = tables.evidence.len(),
            test_rows = tables.tests.len(),
            citation_rows = tables.citations.len(),
            "Loaded reference tables"
        );

        Ok(tables)
    }
}

/// Read one CSV table, checking that the required columns exist.
fn read_table<T: DeserializeOwned>(path: &Path, required: &[&str]) -> LoadResult<Vec<T>> {
    if !path.is_file() {
        return Err(LoadError::MissingFile(path.to_path_buf()));
    }
    debug!(path = %path.display(), "Reading reference table");

    let csv_error = |source: csv::Error| LoadError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_path(path)
        .map_err(csv_error)?;

    let headers = reader.headers().map_err(csv_error)?.clone();
    for column in required {
        if !headers.iter().any(|h| h == *column) {
            return Err(LoadError::MissingColumn {
                path: path.to_path_buf(),
                column: column.to_string(),
            });
        }
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let mut record = record.map_err(csv_error)?;
        // Ragged rows: pad so trailing fields read as missing
        while record.len() < headers.len() {
            record.push_field("");
        }
        rows.push(record.deserialize(Some(&headers)).map_err(csv_error)?);
    }
    Ok(rows)
}
