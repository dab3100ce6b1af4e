//! Differential scoring.
//!
//! Pipeline: Canonical Findings → Weighted Aggregation → Softmax → Ranking
//!
//! Evidence rows are visited in table order. Each row whose finding is present
//! adds its weight to the disease total; the first contribution fixes the
//! disease's tie-break position. Totals are normalised with a stable softmax,
//! converted to percentages, sorted (stable) and truncated.

mod softmax;

pub use softmax::*;

use std::collections::HashMap;

use crate::models::{
    CanonicalFindingSet, DataDefect, DiseaseEvidenceRow, Differential, ReferenceTable,
    ScoredCandidate, Weight,
};

/// Default number of candidates returned.
pub const MAX_TOP: usize = 5;

/// Score the findings against an evidence table and keep the top `top_k`.
pub fn score(
    findings: &CanonicalFindingSet,
    evidence: &[DiseaseEvidenceRow],
    top_k: usize,
) -> Differential {
    let defects = evidence_defects(evidence);
    let tallies = aggregate(findings, evidence.iter().enumerate());
    finalize(tallies, top_k, defects)
}

/// Full, untruncated ranking.
pub fn rank(findings: &CanonicalFindingSet, evidence: &[DiseaseEvidenceRow]) -> Differential {
    score(findings, evidence, usize::MAX)
}

/// Report every evidence row that scoring has to recover from.
///
/// Rows without a disease or finding are skipped; rows without a citation
/// still score; non-numeric weights fall back to 1.
pub fn evidence_defects(evidence: &[DiseaseEvidenceRow]) -> Vec<DataDefect> {
    let mut defects = Vec::new();

    for (index, row) in evidence.iter().enumerate() {
        let row_number = index + 1;
        if row.disease_name().is_none() {
            defects.push(DataDefect::missing_field(
                ReferenceTable::DiseaseEvidence,
                row_number,
                "disease",
            ));
        }
        if row.normalized_finding().is_none() {
            defects.push(DataDefect::missing_field(
                ReferenceTable::DiseaseEvidence,
                row_number,
                "finding_text",
            ));
        }
        if row.citation().is_none() {
            defects.push(DataDefect::missing_field(
                ReferenceTable::DiseaseEvidence,
                row_number,
                "citation_id",
            ));
        }
        if let Weight::Invalid(raw) = &row.weight {
            defects.push(DataDefect::non_numeric_weight(row_number, raw));
        }
    }

    defects
}

/// Running total for one disease.
#[derive(Debug)]
pub(crate) struct Tally {
    name: String,
    raw_score: f64,
    findings: Vec<String>,
    finding_keys: Vec<String>,
    citations: Vec<String>,
}

/// Sum matched weights per disease, in first-contribution order.
///
/// `rows` must yield rows in evidence-table order; callers that pre-filter
/// through an index keep that order.
pub(crate) fn aggregate<'a, I>(findings: &CanonicalFindingSet, rows: I) -> Vec<Tally>
where
    I: IntoIterator<Item = (usize, &'a DiseaseEvidenceRow)>,
{
    let mut tallies: Vec<Tally> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for (_, row) in rows {
        let (Some(disease), Some(finding_key)) = (row.disease_name(), row.normalized_finding())
        else {
            continue;
        };
        if !findings.contains_normalized(&finding_key) {
            continue;
        }

        let position = *positions.entry(disease.to_string()).or_insert_with(|| {
            tallies.push(Tally {
                name: disease.to_string(),
                raw_score: 0.0,
                findings: Vec::new(),
                finding_keys: Vec::new(),
                citations: Vec::new(),
            });
            tallies.len() - 1
        });

        let tally = &mut tallies[position];
        // Saturate so huge weights cannot overflow to infinity
        tally.raw_score = (tally.raw_score + row.weight.value()).clamp(f64::MIN, f64::MAX);

        if !tally.finding_keys.contains(&finding_key) {
            let display = row
                .finding_text
                .as_deref()
                .map(str::trim)
                .unwrap_or_default()
                .to_string();
            tally.findings.push(display);
            tally.finding_keys.push(finding_key);
        }
        if let Some(citation) = row.citation() {
            if !tally.citations.iter().any(|c| c == citation) {
                tally.citations.push(citation.to_string());
            }
        }
    }

    tallies
}

/// Normalise, rank and truncate aggregated totals.
pub(crate) fn finalize(tallies: Vec<Tally>, top_k: usize, defects: Vec<DataDefect>) -> Differential {
    if tallies.is_empty() {
        return Differential {
            defects,
            ..Default::default()
        };
    }

    let raw: Vec<f64> = tallies.iter().map(|t| t.raw_score).collect();
    let percentages = to_percentages(&softmax(&raw));

    let mut candidates: Vec<ScoredCandidate> = tallies
        .into_iter()
        .zip(percentages)
        .map(|(tally, probability)| ScoredCandidate {
            name: tally.name,
            raw_score: tally.raw_score,
            probability,
            matched_findings: tally.findings,
            citation_ids: tally.citations,
        })
        .collect();

    // Stable: equal probabilities keep first-contribution order
    candidates.sort_by(|a, b| {
        b.probability
            .partial_cmp(&a.probability)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let ranked_count = candidates.len();
    let probability_mass = candidates.iter().map(|c| c.probability).sum();
    candidates.truncate(top_k);

    tracing::debug!(
        ranked = ranked_count,
        returned = candidates.len(),
        top = candidates.first().map(|c| c.name.as_str()).unwrap_or(""),
        "Scored differential"
    );

    Differential {
        candidates,
        ranked_count,
        probability_mass,
        defects,
    }
}
