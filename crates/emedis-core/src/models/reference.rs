//! Follow-up test and citation reference rows.

use serde::{Deserialize, Serialize};

/// A follow-up test suggested for a disease.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct TestSuggestion {
    /// Disease the test helps confirm or exclude
    #[serde(default)]
    pub disease: String,
    /// Test name (e.g., "Chest X-ray")
    #[serde(default)]
    pub test_name: String,
    /// Short rationale shown to the clinician
    #[serde(default)]
    pub why: String,
}

impl TestSuggestion {
    pub fn new(
        disease: impl Into<String>,
        test_name: impl Into<String>,
        why: impl Into<String>,
    ) -> Self {
        Self {
            disease: disease.into(),
            test_name: test_name.into(),
            why: why.into(),
        }
    }
}

/// A literature or guideline source backing evidence rows.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Citation {
    #[serde(default)]
    pub citation_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    /// Publisher or guideline body
    #[serde(default)]
    pub source: String,
}

impl Citation {
    pub fn new(
        citation_id: impl Into<String>,
        title: impl Into<String>,
        url: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            citation_id: citation_id.into(),
            title: title.into(),
            url: url.into(),
            source: source.into(),
        }
    }
}
