//! Case input models.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Patient sex as recorded on the case form.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum Sex {
    #[serde(rename = "M")]
    Male,
    #[serde(rename = "F")]
    Female,
    #[default]
    Other,
}

impl FromStr for Sex {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "m" | "male" => Ok(Sex::Male),
            "f" | "female" => Ok(Sex::Female),
            "other" | "o" => Ok(Sex::Other),
            other => Err(format!("unknown sex: {}", other)),
        }
    }
}

impl fmt::Display for Sex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sex::Male => f.write_str("M"),
            Sex::Female => f.write_str("F"),
            Sex::Other => f.write_str("Other"),
        }
    }
}

/// One laboratory result row.
///
/// Lab results are recorded with the case and echoed in the report. They do
/// not influence scoring.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LabResult {
    /// Test name (e.g., "CRP")
    pub test_name: String,
    /// Value as entered
    pub value: String,
    /// Unit (e.g., "mg/L")
    pub unit: Option<String>,
    /// Abnormal flag (e.g., "H", "L")
    pub flag: Option<String>,
}

impl LabResult {
    pub fn new(test_name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            test_name: test_name.into(),
            value: value.into(),
            unit: None,
            flag: None,
        }
    }

    /// Parse `NAME=VALUE[:UNIT[:FLAG]]`.
    pub fn parse_spec(spec: &str) -> Option<Self> {
        let (name, rest) = spec.split_once('=')?;
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        let mut parts = rest.splitn(3, ':').map(str::trim);
        let value = parts.next().filter(|v| !v.is_empty())?;
        let unit = parts.next().filter(|u| !u.is_empty()).map(String::from);
        let flag = parts.next().filter(|f| !f.is_empty()).map(String::from);
        Some(Self {
            test_name: name.to_string(),
            value: value.to_string(),
            unit,
            flag,
        })
    }
}

/// A clinical case as entered by the clinician.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct CaseInput {
    /// Age in years
    pub age: Option<u8>,
    /// Patient sex
    pub sex: Sex,
    /// Chief complaint (e.g., "Fever and cough"), recorded but not scanned
    pub chief_complaint: String,
    /// Free-text symptoms and findings; the only field scanned for findings
    pub findings_text: String,
    /// Laboratory results
    pub labs: Vec<LabResult>,
}

impl CaseInput {
    /// Create a case from free-text findings only.
    pub fn from_findings(findings_text: impl Into<String>) -> Self {
        Self {
            findings_text: findings_text.into(),
            ..Default::default()
        }
    }

}
