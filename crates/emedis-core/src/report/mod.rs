//! Case reports.
//!
//! A [`CaseReport`] is the single artefact handed back to the clinician for a
//! case: the extracted findings, the ranked differential (or an explicit
//! no-match outcome), follow-up tests, sources and any data defects met along
//! the way. Reports serialize to JSON and render to plain text.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::models::{
    Citation, DataDefect, Differential, LabResult, Sex, TestSuggestion,
};

/// Banner carried by every report.
pub const DISCLAIMER: &str = "Prototype clinical decision-support for clinicians. \
Not for diagnostic use. Enter de-identified data only.";

/// Result of scoring one case.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CaseOutcome {
    /// At least one disease received evidence
    Ranked { differential: Differential },
    /// No finding matched any evidence row
    NoMatch,
}

/// Everything produced for one case.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CaseReport {
    /// Unique id for this evaluation (UUID v4)
    pub case_id: String,
    /// Evaluation timestamp (RFC 3339)
    pub analyzed_at: String,
    /// Fingerprint of the reference tables used
    pub knowledge_base_fingerprint: String,
    /// Age in years, as entered
    pub age: Option<u8>,
    /// Sex, as entered
    pub sex: Sex,
    /// Chief complaint, as entered
    #[serde(default)]
    pub chief_complaint: String,
    /// Canonical findings extracted from the case text
    pub findings: Vec<String>,
    pub outcome: CaseOutcome,
    /// Follow-up tests for the returned candidates
    pub suggested_tests: Vec<TestSuggestion>,
    /// Sources supporting the returned candidates
    pub citations: Vec<Citation>,
    /// Lab results, echoed unchanged
    pub labs: Vec<LabResult>,
    /// Reference data defects met while extracting and scoring
    pub defects: Vec<DataDefect>,
    pub disclaimer: String,
}

impl CaseReport {
    /// The differential, if any disease was ranked.
    pub fn differential(&self) -> Option<&Differential> {
        match &self.outcome {
            CaseOutcome::Ranked { differential } => Some(differential),
            CaseOutcome::NoMatch => None,
        }
    }

    pub fn is_no_match(&self) -> bool {
        matches!(self.outcome, CaseOutcome::NoMatch)
    }

    /// Export to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Render as plain text for a terminal or a printout.
    pub fn to_text(&self) -> String {
        let mut out = String::new();

        // Writing into a String cannot fail
        let _ = writeln!(out, "{}", self.disclaimer);
        let _ = writeln!(out);
        let _ = writeln!(out, "Case {}  ({})", self.case_id, self.analyzed_at);
        let age = self
            .age
            .map(|a| a.to_string())
            .unwrap_or_else(|| "-".to_string());
        let _ = writeln!(out, "Age: {}  Sex: {}", age, self.sex);
        if !self.chief_complaint.trim().is_empty() {
            let _ = writeln!(out, "Chief complaint: {}", self.chief_complaint.trim());
        }

        let _ = writeln!(out);
        if self.findings.is_empty() {
            let _ = writeln!(out, "Findings: none recognised");
        } else {
            let _ = writeln!(out, "Findings: {}", self.findings.join(", "));
        }

        let _ = writeln!(out);
        match &self.outcome {
            CaseOutcome::NoMatch => {
                let _ = writeln!(out, "Differential: no matching evidence");
            }
            CaseOutcome::Ranked { differential } => {
                let _ = writeln!(
                    out,
                    "Differential (top {} of {}):",
                    differential.candidates.len(),
                    differential.ranked_count
                );
                for (rank, candidate) in differential.candidates.iter().enumerate() {
                    let _ = writeln!(
                        out,
                        "  {}. {:<28} {:>5.1}%  (score {})",
                        rank + 1,
                        candidate.name,
                        candidate.probability,
                        candidate.raw_score
                    );
                    if !candidate.matched_findings.is_empty() {
                        let _ = writeln!(
                            out,
                            "     supported by: {}",
                            candidate.matched_findings.join(", ")
                        );
                    }
                }
            }
        }

        if !self.suggested_tests.is_empty() {
            let _ = writeln!(out);
            let _ = writeln!(out, "Suggested tests:");
            for test in &self.suggested_tests {
                let _ = writeln!(out, "  - {} ({}): {}", test.test_name, test.disease, test.why);
            }
        }

        if !self.labs.is_empty() {
            let _ = writeln!(out);
            let _ = writeln!(out, "Labs (not scored):");
            for lab in &self.labs {
                let unit = lab.unit.as_deref().unwrap_or("");
                let flag = lab.flag.as_deref().map(|f| format!(" [{}]", f)).unwrap_or_default();
                let _ = writeln!(out, "  - {}: {} {}{}", lab.test_name, lab.value, unit, flag);
            }
        }

        if !self.citations.is_empty() {
            let _ = writeln!(out);
            let _ = writeln!(out, "Sources:");
            for citation in &self.citations {
                let _ = writeln!(
                    out,
                    "  [{}] {}, {} <{}>",
                    citation.citation_id, citation.title, citation.source, citation.url
                );
            }
        }

        if !self.defects.is_empty() {
            let _ = writeln!(out);
            let _ = writeln!(out, "Reference data warnings:");
            for defect in &self.defects {
                let _ = writeln!(out, "  - {}", defect);
            }
        }

        let _ = writeln!(out);
        let _ = writeln!(out, "Knowledge base {}", self.knowledge_base_fingerprint);
        out
    }
}

impl Differential {
    /// Export candidates to CSV format.
    pub fn to_csv(&self) -> String {
        let mut csv = String::new();

        csv.push_str("rank,disease,probability,raw_score,matched_findings,citation_ids\n");

        for (rank, candidate) in self.candidates.iter().enumerate() {
            csv.push_str(&format!(
                "{},{},{:.1},{},{},{}\n",
                rank + 1,
                escape_csv(&candidate.name),
                candidate.probability,
                candidate.raw_score,
                escape_csv(&candidate.matched_findings.join("; ")),
                escape_csv(&candidate.citation_ids.join("; ")),
            ));
        }

        csv
    }
}

/// Escape a string for CSV output.
fn escape_csv(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}
