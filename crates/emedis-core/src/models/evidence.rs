//! Disease evidence models.

use std::fmt;

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};

use super::finding::normalize_text;

/// Evidence weight as found in the reference table.
///
/// Absent and unparseable weights both resolve to [`Weight::DEFAULT`], row by row.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Weight {
    /// A finite numeric weight
    Value(f64),
    /// No weight column, or an empty cell
    #[default]
    Missing,
    /// A cell that is not a finite number (e.g., "n/a")
    Invalid(String),
}

impl Weight {
    /// Weight applied when the cell is missing or not numeric.
    pub const DEFAULT: f64 = 1.0;

    /// Parse a raw cell.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            None | Some("") => Weight::Missing,
            Some(s) => match s.parse::<f64>() {
                Ok(v) if v.is_finite() => Weight::Value(v),
                _ => Weight::Invalid(s.to_string()),
            },
        }
    }

    /// Effective numeric weight.
    pub fn value(&self) -> f64 {
        match self {
            Weight::Value(v) => *v,
            Weight::Missing | Weight::Invalid(_) => Self::DEFAULT,
        }
    }

    /// Raw text form for storage; `None` for a missing weight.
    pub fn to_raw(&self) -> Option<String> {
        match self {
            Weight::Value(v) => Some(v.to_string()),
            Weight::Missing => None,
            Weight::Invalid(s) => Some(s.clone()),
        }
    }
}

impl From<f64> for Weight {
    fn from(v: f64) -> Self {
        if v.is_finite() {
            Weight::Value(v)
        } else {
            Weight::Invalid(v.to_string())
        }
    }
}

impl From<&str> for Weight {
    fn from(raw: &str) -> Self {
        Weight::parse(Some(raw))
    }
}

impl From<Option<f64>> for Weight {
    fn from(v: Option<f64>) -> Self {
        v.map(Weight::from).unwrap_or(Weight::Missing)
    }
}

impl Serialize for Weight {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Weight::Value(v) => serializer.serialize_f64(*v),
            Weight::Missing => serializer.serialize_none(),
            Weight::Invalid(s) => serializer.serialize_str(s),
        }
    }
}

struct WeightVisitor;

impl<'de> Visitor<'de> for WeightVisitor {
    type Value = Weight;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a numeric weight, text, or nothing")
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Weight, E> {
        Ok(Weight::from(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Weight, E> {
        Ok(Weight::Value(v as f64))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Weight, E> {
        Ok(Weight::Value(v as f64))
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Weight, E> {
        Ok(Weight::Invalid(v.to_string()))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Weight, E> {
        Ok(Weight::parse(Some(v)))
    }

    fn visit_unit<E: de::Error>(self) -> Result<Weight, E> {
        Ok(Weight::Missing)
    }

    fn visit_none<E: de::Error>(self) -> Result<Weight, E> {
        Ok(Weight::Missing)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Weight, D::Error> {
        deserializer.deserialize_any(WeightVisitor)
    }
}

impl<'de> Deserialize<'de> for Weight {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(WeightVisitor)
    }
}

/// One piece of evidence: finding X contributes weight W toward disease D,
/// supported by citation C.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct DiseaseEvidenceRow {
    /// Candidate diagnosis name
    #[serde(default)]
    pub disease: Option<String>,
    /// Canonical finding this row responds to
    #[serde(default)]
    pub finding_text: Option<String>,
    /// Evidence weight (defaults to 1 when missing or non-numeric)
    #[serde(default)]
    pub weight: Weight,
    /// Citation supporting the association
    #[serde(default)]
    pub citation_id: Option<String>,
}

impl DiseaseEvidenceRow {
    /// Create an evidence row with every field present.
    pub fn new(
        disease: impl Into<String>,
        finding_text: impl Into<String>,
        weight: impl Into<Weight>,
        citation_id: impl Into<String>,
    ) -> Self {
        Self {
            disease: Some(disease.into()),
            finding_text: Some(finding_text.into()),
            weight: weight.into(),
            citation_id: Some(citation_id.into()),
        }
    }

    /// Trimmed disease name, if present and non-blank.
    pub fn disease_name(&self) -> Option<&str> {
        self.disease
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
    }

    /// Normalized finding text, if present and non-blank.
    pub fn normalized_finding(&self) -> Option<String> {
        self.finding_text
            .as_deref()
            .map(normalize_text)
            .filter(|f| !f.is_empty())
    }

    /// Trimmed citation id, if present and non-blank.
    pub fn citation(&self) -> Option<&str> {
        self.citation_id
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }
}
