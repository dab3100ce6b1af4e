//! eMedis Core Library
//!
//! Clinical finding extraction and differential scoring against a reference
//! knowledge base of disease–finding associations.
//!
//! # Architecture
//!
//! ```text
//!           Findings text
//!                 │
//!                 ▼
//!        Finding Extractor  ◄──── finding dictionary
//!                 │
//!         canonical findings
//!                 │
//!                 ▼
//!       Differential Scorer ◄──── disease evidence
//!                 │
//!     raw totals → softmax → ranked top-K
//!                 │
//!     ┌───────────┴───────────┐
//!     ▼                       ▼
//! Follow-up tests         Citations
//!     └───────────┬───────────┘
//!                 ▼
//!            Case Report
//! ```
//!
//! # Core Principle
//!
//! **Output is decision support, not a diagnosis.** Probabilities are a
//! softmax over summed evidence weights and carry no calibration guarantee.
//!
//! # Modules
//!
//! - [`extractor`]: Literal phrase matching (substring, token, fuzzy)
//! - [`scorer`]: Weighted aggregation, softmax, ranking
//! - [`knowledge`]: Reference tables, CSV loading, indexed knowledge base, atomic reload
//! - [`db`]: SQLite reference store
//! - [`analysis`]: Per-case pipeline and report assembly
//! - [`report`]: Case report rendering and export
//! - [`config`]: TOML engine configuration
//! - [`models`]: Domain types (CaseInput, DiseaseEvidenceRow, ScoredCandidate, etc.)

pub mod analysis;
pub mod config;
pub mod db;
pub mod extractor;
pub mod knowledge;
pub mod models;
pub mod report;
pub mod scorer;

// Re-export commonly used types
pub use analysis::{analyze_case, AnalysisError, Analyzer, ReferenceSource};
pub use config::EngineConfig;
pub use db::Database;
pub use extractor::{extract, extract_with, FindingMatcher, MatcherKind};
pub use knowledge::{KnowledgeBase, KnowledgeStore, ReferenceTables};
pub use models::{
    CanonicalFindingSet, CaseInput, DataDefect, DiseaseEvidenceRow, Differential,
    FindingDictionaryEntry, LabResult, ScoredCandidate, Sex,
};
pub use report::{CaseOutcome, CaseReport};
pub use scorer::{rank, score, MAX_TOP};

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use std::path::PathBuf;
use std::sync::Arc;

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum EmedisError {
    #[error("Reference data unavailable: {0}")]
    ReferenceDataUnavailable(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<AnalysisError> for EmedisError {
    fn from(e: AnalysisError) -> Self {
        match e {
            AnalysisError::ReferenceDataUnavailable(msg) => {
                EmedisError::ReferenceDataUnavailable(msg)
            }
        }
    }
}

impl From<knowledge::LoadError> for EmedisError {
    fn from(e: knowledge::LoadError) -> Self {
        EmedisError::ReferenceDataUnavailable(e.to_string())
    }
}

impl From<db::DbError> for EmedisError {
    fn from(e: db::DbError) -> Self {
        EmedisError::ReferenceDataUnavailable(e.to_string())
    }
}

impl From<serde_json::Error> for EmedisError {
    fn from(e: serde_json::Error) -> Self {
        EmedisError::SerializationError(e.to_string())
    }
}

// =========================================================================
// Factory Functions (exported to FFI)
// =========================================================================

/// Load the CSV reference tables under `data_dir`.
#[uniffi::export]
pub fn open_knowledge_base(data_dir: String) -> Result<Arc<EmedisCore>, EmedisError> {
    let config = EngineConfig {
        data_dir: PathBuf::from(data_dir),
        ..Default::default()
    };
    EmedisCore::open(config)
}

/// Load the reference tables from a SQLite reference store.
#[uniffi::export]
pub fn open_knowledge_base_from_db(path: String) -> Result<Arc<EmedisCore>, EmedisError> {
    let config = EngineConfig {
        database: Some(PathBuf::from(path)),
        ..Default::default()
    };
    EmedisCore::open(config)
}

// =========================================================================
// Main API Object
// =========================================================================

/// Thread-safe engine handle for FFI.
#[derive(uniffi::Object)]
pub struct EmedisCore {
    store: KnowledgeStore,
    source: ReferenceSource,
    config: EngineConfig,
}

impl EmedisCore {
    fn open(config: EngineConfig) -> Result<Arc<Self>, EmedisError> {
        let source = ReferenceSource::from_config(&config);
        let store = source.open()?;
        Ok(Arc::new(Self {
            store,
            source,
            config,
        }))
    }

    fn snapshot(&self) -> Result<Arc<KnowledgeBase>, EmedisError> {
        self.store.snapshot().ok_or_else(|| {
            EmedisError::ReferenceDataUnavailable("no knowledge base loaded".to_string())
        })
    }
}

#[uniffi::export]
impl EmedisCore {
    // =========================================================================
    // Core Operations
    // =========================================================================

    /// Canonical findings present in free text.
    pub fn extract_findings(&self, text: String) -> Result<Vec<String>, EmedisError> {
        let kb = self.snapshot()?;
        let analyzer = Analyzer::with_config(&kb, &self.config);
        Ok(analyzer.extract(&text).findings.to_vec())
    }

    /// Rank diseases for a set of canonical findings.
    pub fn score_findings(
        &self,
        findings: Vec<String>,
        top_k: u32,
    ) -> Result<Vec<FfiScoredCandidate>, EmedisError> {
        let kb = self.snapshot()?;
        let set: CanonicalFindingSet = findings.iter().collect();
        let differential = kb.score(&set, top_k as usize);
        Ok(differential.candidates.into_iter().map(|c| c.into()).collect())
    }

    /// Run the full pipeline for one case.
    pub fn analyze_case(&self, case: FfiCaseInput) -> Result<FfiCaseReport, EmedisError> {
        let case = CaseInput::try_from(case)?;
        let report = analyze_case(&self.store, &case, &self.config)?;
        Ok(report.into())
    }

    /// Run the full pipeline and return the report as JSON.
    pub fn analyze_case_json(&self, case: FfiCaseInput) -> Result<String, EmedisError> {
        let case = CaseInput::try_from(case)?;
        let report = analyze_case(&self.store, &case, &self.config)?;
        Ok(report.to_json()?)
    }

    // =========================================================================
    // Knowledge Base Operations
    // =========================================================================

    /// Re-read the reference tables and swap them in. Returns the new fingerprint.
    ///
    /// On failure the previous tables stay active.
    pub fn reload(&self) -> Result<String, EmedisError> {
        let kb = self.source.reload_into(&self.store)?;
        Ok(kb.fingerprint().to_string())
    }

    /// Fingerprint of the active reference tables.
    pub fn fingerprint(&self) -> Result<String, EmedisError> {
        Ok(self.snapshot()?.fingerprint().to_string())
    }

    /// Row counts and defect count of the active reference tables.
    pub fn stats(&self) -> Result<FfiKnowledgeStats, EmedisError> {
        Ok(self.snapshot()?.stats().into())
    }
}

// =========================================================================
// FFI Types
// =========================================================================

/// FFI-safe lab result.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiLabResult {
    pub test_name: String,
    pub value: String,
    pub unit: Option<String>,
    pub flag: Option<String>,
}

impl From<LabResult> for FfiLabResult {
    fn from(lab: LabResult) -> Self {
        Self {
            test_name: lab.test_name,
            value: lab.value,
            unit: lab.unit,
            flag: lab.flag,
        }
    }
}

impl From<FfiLabResult> for LabResult {
    fn from(lab: FfiLabResult) -> Self {
        LabResult {
            test_name: lab.test_name,
            value: lab.value,
            unit: lab.unit,
            flag: lab.flag,
        }
    }
}

/// FFI-safe case input.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiCaseInput {
    pub age: Option<u8>,
    /// "M", "F" or "Other"
    pub sex: String,
    pub chief_complaint: String,
    pub findings_text: String,
    pub labs: Vec<FfiLabResult>,
}

impl TryFrom<FfiCaseInput> for CaseInput {
    type Error = EmedisError;

    fn try_from(case: FfiCaseInput) -> Result<Self, Self::Error> {
        let sex = if case.sex.trim().is_empty() {
            Sex::default()
        } else {
            case.sex.parse().map_err(EmedisError::InvalidInput)?
        };
        Ok(CaseInput {
            age: case.age,
            sex,
            chief_complaint: case.chief_complaint,
            findings_text: case.findings_text,
            labs: case.labs.into_iter().map(|l| l.into()).collect(),
        })
    }
}

/// FFI-safe scored candidate.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiScoredCandidate {
    pub name: String,
    pub raw_score: f64,
    pub probability: f64,
    pub matched_findings: Vec<String>,
    pub citation_ids: Vec<String>,
}

impl From<ScoredCandidate> for FfiScoredCandidate {
    fn from(candidate: ScoredCandidate) -> Self {
        Self {
            name: candidate.name,
            raw_score: candidate.raw_score,
            probability: candidate.probability,
            matched_findings: candidate.matched_findings,
            citation_ids: candidate.citation_ids,
        }
    }
}

/// FFI-safe follow-up test.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiTestSuggestion {
    pub disease: String,
    pub test_name: String,
    pub why: String,
}

impl From<models::TestSuggestion> for FfiTestSuggestion {
    fn from(test: models::TestSuggestion) -> Self {
        Self {
            disease: test.disease,
            test_name: test.test_name,
            why: test.why,
        }
    }
}

/// FFI-safe citation.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiCitation {
    pub citation_id: String,
    pub title: String,
    pub url: String,
    pub source: String,
}

impl From<models::Citation> for FfiCitation {
    fn from(citation: models::Citation) -> Self {
        Self {
            citation_id: citation.citation_id,
            title: citation.title,
            url: citation.url,
            source: citation.source,
        }
    }
}

/// FFI-safe case report.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiCaseReport {
    pub case_id: String,
    pub analyzed_at: String,
    pub knowledge_base_fingerprint: String,
    pub chief_complaint: String,
    pub findings: Vec<String>,
    /// False when no finding matched any evidence
    pub matched: bool,
    pub candidates: Vec<FfiScoredCandidate>,
    /// Diseases ranked before truncation
    pub ranked_count: u32,
    pub suggested_tests: Vec<FfiTestSuggestion>,
    pub citations: Vec<FfiCitation>,
    pub labs: Vec<FfiLabResult>,
    /// Human-readable data defect descriptions
    pub defects: Vec<String>,
    pub disclaimer: String,
}

impl From<CaseReport> for FfiCaseReport {
    fn from(report: CaseReport) -> Self {
        let (matched, candidates, ranked_count) = match report.outcome {
            CaseOutcome::Ranked { differential } => (
                true,
                differential.candidates.into_iter().map(|c| c.into()).collect(),
                differential.ranked_count as u32,
            ),
            CaseOutcome::NoMatch => (false, Vec::new(), 0),
        };

        Self {
            case_id: report.case_id,
            analyzed_at: report.analyzed_at,
            knowledge_base_fingerprint: report.knowledge_base_fingerprint,
            chief_complaint: report.chief_complaint,
            findings: report.findings,
            matched,
            candidates,
            ranked_count,
            suggested_tests: report.suggested_tests.into_iter().map(|t| t.into()).collect(),
            citations: report.citations.into_iter().map(|c| c.into()).collect(),
            labs: report.labs.into_iter().map(|l| l.into()).collect(),
            defects: report.defects.iter().map(|d| d.to_string()).collect(),
            disclaimer: report.disclaimer,
        }
    }
}

/// FFI-safe knowledge base statistics.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiKnowledgeStats {
    pub dictionary_rows: u32,
    pub evidence_rows: u32,
    pub diseases: u32,
    pub test_rows: u32,
    pub citation_rows: u32,
    pub defects: u32,
    pub fingerprint: String,
    pub loaded_at: String,
}

impl From<knowledge::KnowledgeStats> for FfiKnowledgeStats {
    fn from(stats: knowledge::KnowledgeStats) -> Self {
        Self {
            dictionary_rows: stats.dictionary_rows as u32,
            evidence_rows: stats.evidence_rows as u32,
            diseases: stats.diseases as u32,
            test_rows: stats.test_rows as u32,
            citation_rows: stats.citation_rows as u32,
            defects: stats.defects as u32,
            fingerprint: stats.fingerprint,
            loaded_at: stats.loaded_at,
        }
    }
}
