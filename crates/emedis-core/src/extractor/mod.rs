//! Finding extraction from free-text case notes.
//!
//! Pipeline: Case Text → Normalization → Phrase Matching → Canonical Findings
//!
//! Matching is literal: a dictionary phrase is present when it occurs in the
//! normalized text. The default strategy is plain substring containment, so
//! "feverish" yields the finding mapped from "fever".

mod matcher;

pub use matcher::*;

use crate::models::{
    normalize_text, CanonicalFindingSet, DataDefect, FindingDictionaryEntry, ReferenceTable,
};

/// Result of scanning one case text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    /// Canonical findings present in the text
    pub findings: CanonicalFindingSet,
    /// Dictionary rows skipped because a required field was missing
    pub defects: Vec<DataDefect>,
}

/// Extract canonical findings using substring matching.
pub fn extract(text: &str, dictionary: &[FindingDictionaryEntry]) -> Extraction {
    extract_with(&SubstringMatcher, text, dictionary)
}

/// Extract canonical findings with a specific matching strategy.
pub fn extract_with(
    matcher: &dyn FindingMatcher,
    text: &str,
    dictionary: &[FindingDictionaryEntry],
) -> Extraction {
    let normalized = normalize_text(text);
    let mut extraction = Extraction::default();

    for (index, entry) in dictionary.iter().enumerate() {
        match entry.resolve() {
            Ok((phrase, canonical)) => {
                if matcher.matches(&normalized, &phrase) {
                    extraction.findings.insert(canonical);
                }
            }
            Err(field) => extraction.defects.push(DataDefect::missing_field(
                ReferenceTable::FindingDictionary,
                index + 1,
                field,
            )),
        }
    }

    tracing::debug!(
        matcher = matcher.name(),
        dictionary_rows = dictionary.len(),
        findings = extraction.findings.len(),
        skipped = extraction.defects.len(),
        "Extracted findings"
    );

    extraction
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dictionary() -> Vec<FindingDictionaryEntry> {
        vec![
            FindingDictionaryEntry::new("fever", "Fever"),
            FindingDictionaryEntry::new("feverish", "Fever"),
            FindingDictionaryEntry::new("pyrexia", "Fever"),
            FindingDictionaryEntry::new("cough", "Cough"),
            FindingDictionaryEntry::new("chest pain", "Chest pain"),
        ]
    }

    #[test]
    fn test_case_and_whitespace_insensitive() {
        let result = extract("  FEVER and cough", &dictionary());
        assert!(result.findings.contains("Fever"));
        assert!(result.findings.contains("Cough"));
        assert!(result.defects.is_empty());
    }

    #[test]
    fn test_many_phrases_one_finding() {
        // "fever" and "feverish" both hit, "Fever" appears once
        let result = extract("Feverish, pyrexia overnight", &dictionary());
        assert_eq!(result.findings.len(), 1);
        assert!(result.findings.contains("Fever"));
    }

    #[test]
    fn test_substring_false_positive_is_kept() {
        let dict = vec![FindingDictionaryEntry::new("ever", "Ever")];
        let result = extract("whatever happened", &dict);
        assert!(result.findings.contains("Ever"));
    }

    #[test]
    fn test_dictionary_phrase_is_normalized() {
        let dict = vec![FindingDictionaryEntry::new("  Chest Pain ", "Chest pain")];
        let result = extract("sharp chest pain on inspiration", &dict);
        assert!(result.findings.contains("chest pain"));
    }

    #[test]
    fn test_no_punctuation_stripping() {
        let dict = vec![FindingDictionaryEntry::new("chest-pain", "Chest pain")];
        let result = extract("chest pain", &dict);
        assert!(result.findings.is_empty());
    }

    #[test]
    fn test_empty_inputs() {
        assert!(extract("", &dictionary()).findings.is_empty());
        assert!(extract("fever", &[]).findings.is_empty());
    }

    #[test]
    fn test_malformed_rows_are_skipped_and_reported() {
        let dict = vec![
            FindingDictionaryEntry::new("fever", "Fever"),
            FindingDictionaryEntry {
                phrase: None,
                canonical_text: Some("Cough".into()),
            },
            FindingDictionaryEntry {
                phrase: Some("rash".into()),
                canonical_text: None,
            },
            FindingDictionaryEntry::new("", "Everything"),
        ];

        let result = extract("fever with rash", &dict);

        assert_eq!(result.findings.to_vec(), vec!["Fever".to_string()]);
        assert_eq!(
            result.defects,
            vec![
                DataDefect::missing_field(ReferenceTable::FindingDictionary, 2, "phrase"),
                DataDefect::missing_field(ReferenceTable::FindingDictionary, 3, "canonical_text"),
                DataDefect::missing_field(ReferenceTable::FindingDictionary, 4, "phrase"),
            ]
        );
    }

    #[test]
    fn test_token_strategy_behind_same_signature() {
        let dict = vec![FindingDictionaryEntry::new("ever", "Ever")];
        let result = extract_with(&TokenMatcher, "whatever happened", &dict);
        assert!(result.findings.is_empty());

        let result = extract_with(&TokenMatcher, "3 days of fever, cough", &dictionary());
        assert!(result.findings.contains("Fever"));
        assert!(result.findings.contains("Cough"));
    }
}
