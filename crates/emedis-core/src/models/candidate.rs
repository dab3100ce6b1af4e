//! Differential diagnosis models produced by the scorer.

use serde::{Deserialize, Serialize};

use super::defect::DataDefect;

/// A candidate diagnosis with its raw evidence total and normalized likelihood.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoredCandidate {
    /// Disease name
    pub name: String,
    /// Sum of matched evidence weights
    pub raw_score: f64,
    /// Softmax likelihood in percent, rounded to one decimal (0.0 - 100.0)
    pub probability: f64,
    /// Canonical findings that contributed, in evidence-table order
    pub matched_findings: Vec<String>,
    /// Citation ids of contributing evidence rows, in evidence-table order
    pub citation_ids: Vec<String>,
}

/// Ranked differential for one case.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Differential {
    /// Top candidates, probability descending
    pub candidates: Vec<ScoredCandidate>,
    /// Number of diseases in the full ranking, before truncation
    pub ranked_count: usize,
    /// Sum of rounded probabilities over the full ranking (100 ± 0.1, or 0 when empty)
    pub probability_mass: f64,
    /// Evidence rows that were defaulted or skipped while scoring
    pub defects: Vec<DataDefect>,
}

impl Differential {
    /// True when no disease received any evidence.
    pub fn is_empty(&self) -> bool {
        self.ranked_count == 0
    }

    /// Highest-ranked candidate.
    pub fn top(&self) -> Option<&ScoredCandidate> {
        self.candidates.first()
    }

    /// Candidate names in rank order.
    pub fn names(&self) -> Vec<&str> {
        self.candidates.iter().map(|c| c.name.as_str()).collect()
    }

    /// Find a returned candidate by name.
    pub fn get(&self, name: &str) -> Option<&ScoredCandidate> {
        self.candidates.iter().find(|c| c.name == name)
    }
}
