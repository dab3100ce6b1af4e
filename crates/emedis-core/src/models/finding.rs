//! Finding dictionary models.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Case-fold and trim. This is the only normalization applied before matching.
pub fn normalize_text(s: &str) -> String {
    s.trim().to_lowercase()
}

/// A single row of the finding dictionary: surface phrase → canonical finding.
///
/// Fields are optional so malformed rows can be carried through loading and
/// reported by the extractor instead of failing the whole table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct FindingDictionaryEntry {
    /// Surface phrase searched for in case text (e.g., "feverish")
    #[serde(default)]
    pub phrase: Option<String>,
    /// Canonical finding the phrase maps to (e.g., "Fever")
    #[serde(default)]
    pub canonical_text: Option<String>,
}

impl FindingDictionaryEntry {
    /// Create a dictionary entry with both fields present.
    pub fn new(phrase: impl Into<String>, canonical_text: impl Into<String>) -> Self {
        Self {
            phrase: Some(phrase.into()),
            canonical_text: Some(canonical_text.into()),
        }
    }

    /// Normalized phrase and trimmed canonical text.
    ///
    /// Returns the name of the first missing field when the row is unusable.
    /// A phrase that is blank after trimming counts as missing, since it would
    /// otherwise match every case text.
    pub fn resolve(&self) -> Result<(String, &str), &'static str> {
        let phrase = self
            .phrase
            .as_deref()
            .map(normalize_text)
            .filter(|p| !p.is_empty())
            .ok_or("phrase")?;
        let canonical = self
            .canonical_text
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .ok_or("canonical_text")?;
        Ok((phrase, canonical))
    }
}

/// Canonical findings extracted from one case.
///
/// Membership is tested on the normalized form so that a dictionary canonical
/// text of "Fever" meets an evidence finding text of "fever". The first
/// spelling inserted is kept for display.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CanonicalFindingSet {
    findings: BTreeMap<String, String>,
}

impl CanonicalFindingSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a canonical finding. Returns false if it was already present.
    pub fn insert(&mut self, canonical: &str) -> bool {
        let key = normalize_text(canonical);
        if self.findings.contains_key(&key) {
            return false;
        }
        self.findings.insert(key, canonical.trim().to_string());
        true
    }

    /// Check membership of arbitrary (un-normalized) finding text.
    pub fn contains(&self, finding_text: &str) -> bool {
        self.findings.contains_key(&normalize_text(finding_text))
    }

    /// Check membership of an already-normalized key.
    pub fn contains_normalized(&self, key: &str) -> bool {
        self.findings.contains_key(key)
    }

    /// Number of distinct findings.
    pub fn len(&self) -> usize {
        self.findings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.findings.is_empty()
    }

    /// Display spellings, ordered by normalized key.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.findings.values().map(String::as_str)
    }

    /// Normalized keys, in order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.findings.keys().map(String::as_str)
    }

    /// Display spellings collected into a vector.
    pub fn to_vec(&self) -> Vec<String> {
        self.findings.values().cloned().collect()
    }
}

impl<S: AsRef<str>> FromIterator<S> for CanonicalFindingSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = Self::new();
        for finding in iter {
            set.insert(finding.as_ref());
        }
        set
    }
}
