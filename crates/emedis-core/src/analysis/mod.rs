//! Case analysis.
//!
//! Pipeline: Case Input → Extraction → Scoring → Test/Citation Join → Case Report
//!
//! Extraction and scoring are the pure core; this module binds them to a
//! knowledge base snapshot and assembles the report around them.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::db::{Database, DbError};
use crate::extractor::{Extraction, FindingMatcher, SubstringMatcher};
use crate::knowledge::{KnowledgeBase, KnowledgeStore, LoadError, ReferenceTables, TablePaths};
use crate::models::{CanonicalFindingSet, CaseInput, Differential};
use crate::report::{CaseOutcome, CaseReport, DISCLAIMER};
use crate::scorer::MAX_TOP;

/// Analysis errors.
///
/// A case that matches nothing is not an error; it yields
/// [`CaseOutcome::NoMatch`].
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Reference data unavailable: {0}")]
    ReferenceDataUnavailable(String),
}

impl From<LoadError> for AnalysisError {
    fn from(e: LoadError) -> Self {
        AnalysisError::ReferenceDataUnavailable(e.to_string())
    }
}

impl From<DbError> for AnalysisError {
    fn from(e: DbError) -> Self {
        AnalysisError::ReferenceDataUnavailable(e.to_string())
    }
}

pub type AnalysisResult<T> = Result<T, AnalysisError>;

/// Where the reference tables come from.
#[derive(Debug, Clone, PartialEq)]
pub enum ReferenceSource {
    /// CSV files under a data directory
    Csv { data_dir: PathBuf, tables: TablePaths },
    /// A SQLite reference store
    Sqlite(PathBuf),
}

impl ReferenceSource {
    /// The SQLite store if one is configured, otherwise the CSV tables.
    pub fn from_config(config: &EngineConfig) -> Self {
        match &config.database {
            Some(path) => ReferenceSource::Sqlite(path.clone()),
            None => ReferenceSource::Csv {
                data_dir: config.data_dir.clone(),
                tables: config.tables.clone(),
            },
        }
    }

    /// Read the four tables.
    pub fn load(&self) -> AnalysisResult<ReferenceTables> {
        match self {
            ReferenceSource::Csv { data_dir, tables } => {
                Ok(ReferenceTables::load(data_dir, tables)?)
            }
            ReferenceSource::Sqlite(path) => {
                Ok(Database::open_read_only(path)?.load_reference_tables()?)
            }
        }
    }

    /// Load the tables into a new store.
    pub fn open(&self) -> AnalysisResult<KnowledgeStore> {
        Ok(KnowledgeStore::new(KnowledgeBase::new(self.load()?)))
    }

    /// Reload `store` from this source; the current snapshot survives a failure.
    pub fn reload_into(&self, store: &KnowledgeStore) -> AnalysisResult<Arc<KnowledgeBase>> {
        match self {
            ReferenceSource::Csv { data_dir, tables } => {
                Ok(store.reload_from_dir(data_dir, tables)?)
            }
            ReferenceSource::Sqlite(path) => Ok(store.reload_from_db(path)?),
        }
    }
}

/// Runs cases against one knowledge base snapshot.
pub struct Analyzer<'a> {
    knowledge_base: &'a KnowledgeBase,
    matcher: Box<dyn FindingMatcher>,
    top_k: usize,
}

impl<'a> Analyzer<'a> {
    /// Substring matching, top [`MAX_TOP`].
    pub fn new(knowledge_base: &'a KnowledgeBase) -> Self {
        Self {
            knowledge_base,
            matcher: Box::new(SubstringMatcher),
            top_k: MAX_TOP,
        }
    }

    pub fn with_config(knowledge_base: &'a KnowledgeBase, config: &EngineConfig) -> Self {
        Self {
            knowledge_base,
            matcher: config.matcher(),
            top_k: config.top_k,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_matcher(mut self, matcher: Box<dyn FindingMatcher>) -> Self {
        self.matcher = matcher;
        self
    }

    /// Extract canonical findings from free text.
    pub fn extract(&self, text: &str) -> Extraction {
        self.knowledge_base.extract_with(self.matcher.as_ref(), text)
    }

    /// Score already-extracted findings.
    pub fn score(&self, findings: &CanonicalFindingSet) -> Differential {
        self.knowledge_base.score(findings, self.top_k)
    }

    /// Run the full pipeline for one case.
    pub fn analyze(&self, case: &CaseInput) -> CaseReport {
        let kb = self.knowledge_base;
        let extraction = self.extract(&case.findings_text);
        let differential = self.score(&extraction.findings);

        let names = differential.names();
        let suggested_tests = kb.suggested_tests(&names).into_iter().cloned().collect();
        let citation_ids: Vec<&str> = differential
            .candidates
            .iter()
            .flat_map(|c| c.citation_ids.iter().map(String::as_str))
            .collect();
        let citations = kb.citations_for(&citation_ids).into_iter().cloned().collect();

        let mut defects = extraction.defects;
        defects.extend(differential.defects.iter().cloned());
        if !defects.is_empty() {
            warn!(
                defects = defects.len(),
                "Reference data defects affected this case"
            );
        }

        debug!(
            findings = extraction.findings.len(),
            ranked = differential.ranked_count,
            returned = differential.candidates.len(),
            matcher = self.matcher.name(),
            "Analyzed case"
        );

        let outcome = if differential.is_empty() {
            CaseOutcome::NoMatch
        } else {
            CaseOutcome::Ranked { differential }
        };

        CaseReport {
            case_id: Uuid::new_v4().to_string(),
            analyzed_at: chrono::Utc::now().to_rfc3339(),
            knowledge_base_fingerprint: kb.fingerprint().to_string(),
            age: case.age,
            sex: case.sex,
            chief_complaint: case.chief_complaint.clone(),
            findings: extraction.findings.to_vec(),
            outcome,
            suggested_tests,
            citations,
            labs: case.labs.clone(),
            defects,
            disclaimer: DISCLAIMER.to_string(),
        }
    }
}

/// Analyze one case against the store's current snapshot.
///
/// The snapshot is taken once, so a concurrent reload cannot change the
/// tables halfway through the case.
pub fn analyze_case(
    store: &KnowledgeStore,
    case: &CaseInput,
    config: &EngineConfig,
) -> AnalysisResult<CaseReport> {
    let kb = store.snapshot().ok_or_else(|| {
        AnalysisError::ReferenceDataUnavailable("no knowledge base loaded".to_string())
    })?;
    Ok(Analyzer::with_config(&kb, config).analyze(case))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::MatcherKind;
    use crate::models::{
        Citation, DataDefect, DiseaseEvidenceRow, FindingDictionaryEntry, LabResult, Sex,
        TestSuggestion,
    };

    fn tables() -> ReferenceTables {
        ReferenceTables {
            dictionary: vec![
                FindingDictionaryEntry::new("fever", "Fever"),
                FindingDictionaryEntry::new("pyrexia", "Fever"),
                FindingDictionaryEntry::new("cough", "Cough"),
                FindingDictionaryEntry::new("ever", "Ever"),
            ],
            evidence: vec![
                DiseaseEvidenceRow::new("Flu", "Fever", 2.0, "C1"),
                DiseaseEvidenceRow::new("Flu", "Cough", 1.0, "C1"),
                DiseaseEvidenceRow::new("Pneumonia", "Cough", 3.0, "C2"),
                DiseaseEvidenceRow::new("Dengue", "Fever", "n/a", "C3"),
            ],
            tests: vec![
                TestSuggestion::new("Pneumonia", "Chest X-ray", "Confirm consolidation"),
                TestSuggestion::new("Flu", "Influenza PCR", "Confirm influenza"),
                TestSuggestion::new("Measles", "Measles IgM", "Confirm measles"),
            ],
            citations: vec![
                Citation::new("C1", "Influenza review", "https://example.org/c1", "CDC"),
                Citation::new("C2", "CAP guideline", "https://example.org/c2", "IDSA"),
                Citation::new("C3", "Dengue guideline", "https://example.org/c3", "WHO"),
                Citation::new("C4", "Unrelated", "https://example.org/c4", "NICE"),
            ],
        }
    }

    #[test]
    fn test_end_to_end_ranked_case() {
        let kb = KnowledgeBase::new(tables());
        let case = CaseInput {
            age: Some(34),
            sex: Sex::Male,
            chief_complaint: "Feeling unwell".into(),
            findings_text: "Fever and cough".into(),
            labs: vec![LabResult::new("CRP", "150")],
        };

        let report = Analyzer::new(&kb).analyze(&case);

        // "ever" is a substring of "fever"
        assert_eq!(report.findings, vec!["Cough", "Ever", "Fever"]);
        let differential = report.differential().unwrap();
        // Flu = 3, Pneumonia = 3, Dengue = 1 (defaulted weight)
        assert_eq!(differential.names(), vec!["Flu", "Pneumonia", "Dengue"]);
        assert_eq!(differential.candidates[0].probability, differential.candidates[1].probability);

        let tests: Vec<_> = report.suggested_tests.iter().map(|t| t.test_name.as_str()).collect();
        assert_eq!(tests, vec!["Influenza PCR", "Chest X-ray"]);

        let citations: Vec<_> = report.citations.iter().map(|c| c.citation_id.as_str()).collect();
        assert_eq!(citations, vec!["C1", "C2", "C3"]);

        assert_eq!(report.chief_complaint, "Feeling unwell");
        assert_eq!(report.labs, case.labs);
        assert_eq!(report.defects, vec![DataDefect::non_numeric_weight(4, "n/a")]);
        assert_eq!(report.knowledge_base_fingerprint, kb.fingerprint());
        assert_eq!(report.disclaimer, DISCLAIMER);
        assert!(Uuid::parse_str(&report.case_id).is_ok());
    }

    #[test]
    fn test_no_match_is_not_an_error() {
        let kb = KnowledgeBase::new(tables());
        let report = Analyzer::new(&kb).analyze(&CaseInput::from_findings("rash on the forearm"));

        assert!(report.is_no_match());
        assert!(report.findings.is_empty());
        assert!(report.suggested_tests.is_empty());
        assert!(report.citations.is_empty());
    }

    #[test]
    fn test_chief_complaint_is_not_scanned() {
        let kb = KnowledgeBase::new(tables());
        let case = CaseInput {
            chief_complaint: "Fever".into(),
            findings_text: "nothing else".into(),
            ..Default::default()
        };
        let report = Analyzer::new(&kb).analyze(&case);

        assert!(report.is_no_match());
        assert!(report.findings.is_empty());
        assert_eq!(report.chief_complaint, "Fever");
    }

    #[test]
    fn test_labs_do_not_change_scores() {
        let kb = KnowledgeBase::new(tables());
        let analyzer = Analyzer::new(&kb);

        let mut case = CaseInput::from_findings("cough");
        let without = analyzer.analyze(&case);
        case.labs = vec![LabResult::parse_spec("WBC=18:10^9/L:H").unwrap()];
        let with = analyzer.analyze(&case);

        assert_eq!(without.outcome, with.outcome);
    }

    #[test]
    fn test_truncation_limits_joins() {
        let kb = KnowledgeBase::new(tables());
        let report = Analyzer::new(&kb)
            .with_top_k(1)
            .analyze(&CaseInput::from_findings("cough"));

        let differential = report.differential().unwrap();
        assert_eq!(differential.names(), vec!["Pneumonia"]);
        assert_eq!(differential.ranked_count, 2);
        // Only the returned candidate's tests and sources
        assert_eq!(report.suggested_tests.len(), 1);
        assert_eq!(report.citations.len(), 1);
        assert_eq!(report.citations[0].citation_id, "C2");
    }

    #[test]
    fn test_token_matcher_from_config() {
        let kb = KnowledgeBase::new(tables());
        let config = EngineConfig {
            matcher: MatcherKind::Token,
            ..Default::default()
        };
        let extraction = Analyzer::with_config(&kb, &config).extract("whatever happened");
        assert!(extraction.findings.is_empty());

        let extraction = Analyzer::new(&kb).extract("whatever happened");
        assert!(extraction.findings.contains("Ever"));
    }

    #[test]
    fn test_analyze_case_requires_loaded_store() {
        let store = KnowledgeStore::empty();
        let result = analyze_case(&store, &CaseInput::from_findings("fever"), &EngineConfig::default());
        assert!(matches!(result, Err(AnalysisError::ReferenceDataUnavailable(_))));

        store.replace(KnowledgeBase::new(tables()));
        let report =
            analyze_case(&store, &CaseInput::from_findings("fever"), &EngineConfig::default())
                .unwrap();
        assert_eq!(report.differential().unwrap().top().map(|c| c.name.as_str()), Some("Flu"));
    }

    #[test]
    fn test_missing_csv_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let source = ReferenceSource::Csv {
            data_dir: dir.path().to_path_buf(),
            tables: TablePaths::default(),
        };
        assert!(matches!(
            source.open(),
            Err(AnalysisError::ReferenceDataUnavailable(_))
        ));
    }

    #[test]
    fn test_source_from_config_prefers_database() {
        let config = EngineConfig {
            database: Some(PathBuf::from("reference.db")),
            ..Default::default()
        };
        assert_eq!(
            ReferenceSource::from_config(&config),
            ReferenceSource::Sqlite(PathBuf::from("reference.db"))
        );
        assert!(matches!(
            ReferenceSource::from_config(&EngineConfig::default()),
            ReferenceSource::Csv { .. }
        ));
    }

    #[test]
    fn test_reload_into_from_sqlite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reference.db");
        Database::open(&path)
            .unwrap()
            .replace_reference_tables(&tables())
            .unwrap();

        let store = KnowledgeStore::empty();
        let kb = ReferenceSource::Sqlite(path).reload_into(&store).unwrap();
        assert_eq!(kb.fingerprint(), tables().fingerprint());
        assert!(store.is_loaded());
    }
}
