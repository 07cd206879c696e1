//! Patient-level request and summary types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::assessment::{Fields, Subscores};
use super::PredictionResult;
use crate::ml_engine::PredictionError;

/// One recorded MoCA test as stored against a patient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MocaTest {
    /// ISO-8601 date (`YYYY-MM-DD`) or RFC 3339 timestamp
    pub date: String,
    #[serde(rename = "totalScore")]
    pub total_score: f64,
    pub subscores: Subscores,
}

/// A patient's date of birth and MoCA history in any order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientRecord {
    /// Optional identifier, echoed in batch output
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub dob: String,
    #[serde(rename = "mocaTests")]
    pub moca_tests: Vec<MocaTest>,
}

impl PatientRecord {
    /// Build a record from JSON, reporting absent keys as
    /// [`PredictionError::MissingField`] indexed by test position.
    pub fn from_value(value: &Value) -> Result<Self, PredictionError> {
        let fields = Fields::of(0, value, "")?;
        let id = match value.get("id") {
            Some(Value::String(s)) => Some(s.clone()),
            _ => None,
        };
        let dob = fields.string("dob")?;
        let moca_tests = fields
            .array("mocaTests")?
            .iter()
            .enumerate()
            .map(|(i, test)| {
                let test_fields = Fields::of(i, test, "")?;
                Ok(MocaTest {
                    date: test_fields.string("date")?,
                    total_score: test_fields.number("totalScore")?,
                    subscores: Subscores::from_fields(&test_fields.object("subscores")?)?,
                })
            })
            .collect::<Result<Vec<_>, PredictionError>>()?;
        Ok(Self { id, dob, moca_tests })
    }

    /// Parse a JSON request body into a record.
    pub fn parse(body: &[u8]) -> Result<Self, PredictionError> {
        let value: Value = serde_json::from_slice(body)
            .map_err(|e| PredictionError::MalformedPayload(format!("invalid JSON: {e}")))?;
        Self::from_value(&value)
    }
}

/// A prediction tagged with the position of its test in the caller's record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientPrediction {
    pub test_index: usize,
    #[serde(flatten)]
    pub result: PredictionResult,
}

/// Overall status derived from the latest prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CdrStatus {
    Stable,
    Monitor,
    CriticalAlert,
}

impl std::fmt::Display for CdrStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CdrStatus::Stable => write!(f, "Stable"),
            CdrStatus::Monitor => write!(f, "Monitor"),
            CdrStatus::CriticalAlert => write!(f, "Critical Alert"),
        }
    }
}

/// Qualitative band for the model's maximum class probability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfidenceLabel {
    Moderate,
    High,
    VeryHigh,
}

impl std::fmt::Display for ConfidenceLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfidenceLabel::Moderate => write!(f, "Moderate"),
            ConfidenceLabel::High => write!(f, "High"),
            ConfidenceLabel::VeryHigh => write!(f, "Very High"),
        }
    }
}

/// Patient-level metrics taken from the most recent visit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientSummary {
    pub current_cdr: f64,
    /// Projected CDR one year out (0.0 when unavailable)
    pub future_cdr: f64,
    pub confidence: f64,
    pub decline_rate: f64,
    pub status: CdrStatus,
    pub confidence_label: ConfidenceLabel,
    pub visit_count: usize,
}

/// Response of the patient prediction endpoint and the batch command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientReport {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub predictions: Vec<PatientPrediction>,
    pub summary: Option<PatientSummary>,
}
