//! Phrase matching strategies.
//!
//! - [`SubstringMatcher`]: contiguous substring, not boundary-aware (default)
//! - [`TokenMatcher`]: phrase must begin and end on word boundaries
//! - [`FuzzyMatcher`]: Jaro-Winkler over token windows, for typo tolerance

use serde::{Deserialize, Serialize};
use strsim::jaro_winkler;

/// Default acceptance threshold for [`FuzzyMatcher`].
pub const DEFAULT_FUZZY_THRESHOLD: f64 = 0.92;

/// Decides whether a dictionary phrase is present in case text.
///
/// Both arguments are already normalized (trimmed, case-folded) and the
/// phrase is never empty.
pub trait FindingMatcher: Send + Sync {
    /// Check whether `phrase` occurs in `text`.
    fn matches(&self, text: &str, phrase: &str) -> bool;

    /// Short strategy name for logs.
    fn name(&self) -> &'static str;
}

/// Plain substring containment. "feverish" matches the phrase "fever".
#[derive(Debug, Clone, Copy, Default)]
pub struct SubstringMatcher;

impl FindingMatcher for SubstringMatcher {
    fn matches(&self, text: &str, phrase: &str) -> bool {
        text.contains(phrase)
    }

    fn name(&self) -> &'static str {
        "substring"
    }
}

/// Substring containment restricted to word boundaries.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenMatcher;

impl FindingMatcher for TokenMatcher {
    fn matches(&self, text: &str, phrase: &str) -> bool {
        text.match_indices(phrase).any(|(start, m)| {
            let end = start + m.len();
            let before_ok = text[..start]
                .chars()
                .next_back()
                .map_or(true, |c| !c.is_alphanumeric());
            let after_ok = text[end..]
                .chars()
                .next()
                .map_or(true, |c| !c.is_alphanumeric());
            before_ok && after_ok
        })
    }

    fn name(&self) -> &'static str {
        "token"
    }
}

/// Fuzzy phrase matching.
///
/// The phrase is compared against every window of text tokens with the same
/// token count; the best Jaro-Winkler similarity must reach the threshold.
#[derive(Debug, Clone, Copy)]
pub struct FuzzyMatcher {
    threshold: f64,
}

impl Default for FuzzyMatcher {
    fn default() -> Self {
        Self::new(DEFAULT_FUZZY_THRESHOLD)
    }
}

impl FuzzyMatcher {
    /// Create a fuzzy matcher; the threshold is clamped to (0, 1].
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold: threshold.clamp(f64::EPSILON, 1.0),
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Best similarity of the phrase against any token window of the text.
    pub fn best_similarity(&self, text: &str, phrase: &str) -> f64 {
        let text_tokens = tokenize(text);
        let phrase_tokens = tokenize(phrase);
        let width = phrase_tokens.len();
        if width == 0 || text_tokens.len() < width {
            return 0.0;
        }
        let target = phrase_tokens.join(" ");

        text_tokens
            .windows(width)
            .map(|window| jaro_winkler(&window.join(" "), &target))
            .fold(0.0, f64::max)
    }
}

impl FindingMatcher for FuzzyMatcher {
    fn matches(&self, text: &str, phrase: &str) -> bool {
        // Exact token hits never depend on the threshold
        if TokenMatcher.matches(text, phrase) {
            return true;
        }
        self.best_similarity(text, phrase) >= self.threshold
    }

    fn name(&self) -> &'static str {
        "fuzzy"
    }
}

/// Split on anything that is not alphanumeric.
fn tokenize(s: &str) -> Vec<&str> {
    s.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Configurable matcher selection.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum MatcherKind {
    #[default]
    Substring,
    Token,
    Fuzzy,
}

impl MatcherKind {
    /// Build the matcher; `fuzzy_threshold` only applies to [`MatcherKind::Fuzzy`].
    pub fn build(self, fuzzy_threshold: f64) -> Box<dyn FindingMatcher> {
        match self {
            MatcherKind::Substring => Box::new(SubstringMatcher),
            MatcherKind::Token => Box::new(TokenMatcher),
            MatcherKind::Fuzzy => Box::new(FuzzyMatcher::new(fuzzy_threshold)),
        }
    }
}

impl std::str::FromStr for MatcherKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "substring" => Ok(MatcherKind::Substring),
            "token" => Ok(MatcherKind::Token),
            "fuzzy" => Ok(MatcherKind::Fuzzy),
            other => Err(format!("unknown matcher: {}", other)),
        }
    }
}
