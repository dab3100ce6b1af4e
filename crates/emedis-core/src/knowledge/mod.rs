//! Reference knowledge base.
//!
//! The four reference tables are loaded once into [`ReferenceTables`] and then
//! indexed into an immutable [`KnowledgeBase`]. Case evaluations only ever
//! read from it; reloads build a new one and swap it in through
//! [`KnowledgeStore`].

mod loader;
mod store;

pub use loader::*;
pub use store::*;

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::extractor::{self, Extraction, FindingMatcher};
use crate::models::{
    CanonicalFindingSet, Citation, DataDefect, DiseaseEvidenceRow, Differential,
    FindingDictionaryEntry, ReferenceTable, TestSuggestion,
};
use crate::scorer;

/// The raw reference tables, in file order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ReferenceTables {
    pub dictionary: Vec<FindingDictionaryEntry>,
    pub evidence: Vec<DiseaseEvidenceRow>,
    pub tests: Vec<TestSuggestion>,
    pub citations: Vec<Citation>,
}

impl ReferenceTables {
    /// SHA-256 (hex) of the tables' canonical JSON form.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        // Plain strings and finite floats always serialize
        if let Ok(bytes) = serde_json::to_vec(self) {
            hasher.update(&bytes);
        }
        hex::encode(hasher.finalize())
    }

    /// True when no table has any rows.
    pub fn is_empty(&self) -> bool {
        self.dictionary.is_empty()
            && self.evidence.is_empty()
            && self.tests.is_empty()
            && self.citations.is_empty()
    }
}

/// Row counts and health of a loaded knowledge base.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KnowledgeStats {
    pub dictionary_rows: usize,
    pub evidence_rows: usize,
    pub diseases: usize,
    pub test_rows: usize,
    pub citation_rows: usize,
    pub defects: usize,
    pub fingerprint: String,
    /// When this knowledge base was indexed (RFC 3339)
    pub loaded_at: String,
}

/// Indexed, read-only view over the reference tables.
#[derive(Debug)]
pub struct KnowledgeBase {
    tables: ReferenceTables,
    /// Normalized finding → evidence row indices (ascending)
    by_finding: HashMap<String, Vec<usize>>,
    /// Disease → evidence row indices (ascending)
    by_disease: HashMap<String, Vec<usize>>,
    /// Diseases in first-appearance order
    diseases: Vec<String>,
    /// Disease → test suggestion indices (ascending)
    tests_by_disease: HashMap<String, Vec<usize>>,
    /// Citation id → first citation row with that id
    citations_by_id: HashMap<String, usize>,
    evidence_defects: Vec<DataDefect>,
    defects: Vec<DataDefect>,
    fingerprint: String,
    loaded_at: DateTime<Utc>,
}

impl KnowledgeBase {
    /// Index the reference tables.
    pub fn new(tables: ReferenceTables) -> Self {
        let mut by_finding: HashMap<String, Vec<usize>> = HashMap::new();
        let mut by_disease: HashMap<String, Vec<usize>> = HashMap::new();
        let mut diseases = Vec::new();

        for (index, row) in tables.evidence.iter().enumerate() {
            let (Some(disease), Some(finding)) = (row.disease_name(), row.normalized_finding())
            else {
                continue;
            };
            by_finding.entry(finding).or_default().push(index);
            let rows = by_disease.entry(disease.to_string()).or_default();
            if rows.is_empty() {
                diseases.push(disease.to_string());
            }
            rows.push(index);
        }

        let mut tests_by_disease: HashMap<String, Vec<usize>> = HashMap::new();
        for (index, test) in tables.tests.iter().enumerate() {
            let disease = test.disease.trim();
            if !disease.is_empty() {
                tests_by_disease
                    .entry(disease.to_string())
                    .or_default()
                    .push(index);
            }
        }

        let mut citations_by_id = HashMap::new();
        for (index, citation) in tables.citations.iter().enumerate() {
            let id = citation.citation_id.trim();
            if !id.is_empty() {
                citations_by_id.entry(id.to_string()).or_insert(index);
            }
        }

        let evidence_defects = scorer::evidence_defects(&tables.evidence);
        let mut defects = dictionary_defects(&tables.dictionary);
        defects.extend(evidence_defects.iter().cloned());
        defects.extend(reference_defects(&tables));

        let fingerprint = tables.fingerprint();

        if !defects.is_empty() {
            tracing::warn!(
                defects = defects.len(),
                "Reference tables contain malformed rows; they will be skipped or defaulted"
            );
        }
        tracing::info!(
            dictionary_rows = tables.dictionary.len(),
            evidence_rows = tables.evidence.len(),
            diseases = diseases.len(),
            test_rows = tables.tests.len(),
            citation_rows = tables.citations.len(),
            fingerprint = %fingerprint,
            "Indexed knowledge base"
        );

        Self {
            tables,
            by_finding,
            by_disease,
            diseases,
            tests_by_disease,
            citations_by_id,
            evidence_defects,
            defects,
            fingerprint,
            loaded_at: Utc::now(),
        }
    }

    pub fn dictionary(&self) -> &[FindingDictionaryEntry] {
        &self.tables.dictionary
    }

    pub fn evidence(&self) -> &[DiseaseEvidenceRow] {
        &self.tables.evidence
    }

    /// Diseases with at least one usable evidence row, in table order.
    pub fn diseases(&self) -> &[String] {
        &self.diseases
    }

    /// SHA-256 (hex) of the reference tables.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Every malformed row across all four tables.
    pub fn defects(&self) -> &[DataDefect] {
        &self.defects
    }

    /// Extract findings with substring matching.
    pub fn extract(&self, text: &str) -> Extraction {
        extractor::extract(text, &self.tables.dictionary)
    }

    /// Extract findings with a specific matching strategy.
    pub fn extract_with(&self, matcher: &dyn FindingMatcher, text: &str) -> Extraction {
        extractor::extract_with(matcher, text, &self.tables.dictionary)
    }

    /// Score findings through the finding index.
    ///
    /// Only rows whose finding is present are visited, in table order, so the
    /// result is identical to [`scorer::score`] over the full table.
    pub fn score(&self, findings: &CanonicalFindingSet, top_k: usize) -> Differential {
        let mut rows: Vec<usize> = findings
            .keys()
            .filter_map(|key| self.by_finding.get(key))
            .flatten()
            .copied()
            .collect();
        rows.sort_unstable();

        let evidence = &self.tables.evidence;
        let tallies = scorer::aggregate(findings, rows.into_iter().map(|i| (i, &evidence[i])));
        scorer::finalize(tallies, top_k, self.evidence_defects.clone())
    }

    /// Evidence rows for a disease, in table order.
    pub fn evidence_for(&self, disease: &str) -> Vec<&DiseaseEvidenceRow> {
        self.by_disease
            .get(disease.trim())
            .map(|rows| rows.iter().map(|&i| &self.tables.evidence[i]).collect())
            .unwrap_or_default()
    }

    /// Follow-up tests for the given diseases, grouped in the order given.
    pub fn suggested_tests<S: AsRef<str>>(&self, diseases: &[S]) -> Vec<&TestSuggestion> {
        let mut seen: Vec<&str> = Vec::new();
        let mut tests = Vec::new();
        for disease in diseases {
            let disease = disease.as_ref().trim();
            if seen.contains(&disease) {
                continue;
            }
            seen.push(disease);
            if let Some(rows) = self.tests_by_disease.get(disease) {
                tests.extend(rows.iter().map(|&i| &self.tables.tests[i]));
            }
        }
        tests
    }

    /// Citations for the given ids, deduplicated, in citation-table order.
    ///
    /// Ids with no citation row are ignored.
    pub fn citations_for<S: AsRef<str>>(&self, ids: &[S]) -> Vec<&Citation> {
        let mut rows: Vec<usize> = ids
            .iter()
            .filter_map(|id| self.citations_by_id.get(id.as_ref().trim()))
            .copied()
            .collect();
        rows.sort_unstable();
        rows.dedup();
        rows.into_iter().map(|i| &self.tables.citations[i]).collect()
    }

    pub fn stats(&self) -> KnowledgeStats {
        KnowledgeStats {
            dictionary_rows: self.tables.dictionary.len(),
            evidence_rows: self.tables.evidence.len(),
            diseases: self.diseases.len(),
            test_rows: self.tables.tests.len(),
            citation_rows: self.tables.citations.len(),
            defects: self.defects.len(),
            fingerprint: self.fingerprint.clone(),
            loaded_at: self.loaded_at.to_rfc3339(),
        }
    }
}

impl From<ReferenceTables> for KnowledgeBase {
    fn from(tables: ReferenceTables) -> Self {
        Self::new(tables)
    }
}

fn dictionary_defects(dictionary: &[FindingDictionaryEntry]) -> Vec<DataDefect> {
    dictionary
        .iter()
        .enumerate()
        .filter_map(|(index, entry)| {
            entry.resolve().err().map(|field| {
                DataDefect::missing_field(ReferenceTable::FindingDictionary, index + 1, field)
            })
        })
        .collect()
}

fn reference_defects(tables: &ReferenceTables) -> Vec<DataDefect> {
    let mut defects = Vec::new();

    for (index, test) in tables.tests.iter().enumerate() {
        for (field, value) in [
            ("disease", &test.disease),
            ("test_name", &test.test_name),
            ("why", &test.why),
        ] {
            if value.trim().is_empty() {
                defects.push(DataDefect::missing_field(
                    ReferenceTable::TestSuggestions,
                    index + 1,
                    field,
                ));
            }
        }
    }

    for (index, citation) in tables.citations.iter().enumerate() {
        for (field, value) in [
            ("citation_id", &citation.citation_id),
            ("title", &citation.title),
            ("url", &citation.url),
            ("source", &citation.source),
        ] {
            if value.trim().is_empty() {
                defects.push(DataDefect::missing_field(
                    ReferenceTable::Citations,
                    index + 1,
                    field,
                ));
            }
        }
    }

    defects
}
