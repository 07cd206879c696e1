//! MoCA assessment input types.
//!
//! Request payloads are walked as `serde_json::Value` rather than through a
//! derived `Deserialize`, so an absent key surfaces as
//! [`PredictionError::MissingField`] with the visit's position, separate from
//! a payload that is structurally malformed.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::ml_engine::PredictionError;

/// MoCA subscale score ranges (inclusive upper bounds, lower bound is 0).
pub mod moca_ranges {
    /// Visuospatial / executive (trail making, cube, clock)
    pub const VISUOSPATIAL_EXEC_MAX: f64 = 5.0;
    /// Naming (three animals)
    pub const NAMING_MAX: f64 = 3.0;
    /// Attention (digit span, tapping, serial 7s)
    pub const ATTENTION_MAX: f64 = 6.0;
    /// Language (sentence repetition, fluency)
    pub const LANGUAGE_MAX: f64 = 3.0;
    /// Abstraction (two similarity pairs)
    pub const ABSTRACTION_MAX: f64 = 2.0;
    /// Delayed recall (five words)
    pub const MEMORY_RECALL_MAX: f64 = 5.0;
    /// Orientation (date, month, year, day, place, city)
    pub const ORIENTATION_MAX: f64 = 6.0;
    /// Total score
    pub const TOTAL_MAX: f64 = 30.0;
}

/// The seven MoCA cognitive subdomain scores for one visit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Subscores {
    #[serde(rename = "visuospatialExec")]
    pub visuospatial_exec: f64,
    pub naming: f64,
    pub attention: f64,
    pub language: f64,
    pub abstraction: f64,
    pub memory_recall: f64,
    pub orientation: f64,
}

impl Subscores {
    /// Subdomain values in model column order.
    pub fn values(&self) -> [f64; 7] {
        [
            self.visuospatial_exec,
            self.naming,
            self.attention,
            self.language,
            self.abstraction,
            self.memory_recall,
            self.orientation,
        ]
    }

    /// Read the `subscores` object of assessment `index`.
    pub(crate) fn from_fields(fields: &Fields<'_>) -> Result<Self, PredictionError> {
        Ok(Self {
            visuospatial_exec: fields.number("visuospatialExec")?,
            naming: fields.number("naming")?,
            attention: fields.number("attention")?,
            language: fields.number("language")?,
            abstraction: fields.number("abstraction")?,
            memory_recall: fields.number("memory_recall")?,
            orientation: fields.number("orientation")?,
        })
    }

    /// Human-readable notes for every subscore outside its MoCA range.
    pub fn range_advisories(&self) -> Vec<String> {
        use moca_ranges::*;

        let checks = [
            ("visuospatialExec", self.visuospatial_exec, VISUOSPATIAL_EXEC_MAX),
            ("naming", self.naming, NAMING_MAX),
            ("attention", self.attention, ATTENTION_MAX),
            ("language", self.language, LANGUAGE_MAX),
            ("abstraction", self.abstraction, ABSTRACTION_MAX),
            ("memory_recall", self.memory_recall, MEMORY_RECALL_MAX),
            ("orientation", self.orientation, ORIENTATION_MAX),
        ];
        checks
            .iter()
            .filter(|(_, value, max)| !(0.0..=*max).contains(value))
            .map(|(name, value, max)| format!("{name} = {value} is outside 0-{max}"))
            .collect()
    }
}

/// One MoCA visit for a single patient, as consumed by the feature deriver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    /// Visit identifier, echoed back on the matching prediction.
    pub date: String,
    /// MoCA total (0-30)
    #[serde(rename = "totalScore")]
    pub total_score: f64,
    /// Cumulative days since the patient's first visit
    pub days_to_visit: f64,
    /// Age at visit (years)
    pub age: f64,
    pub subscores: Subscores,
}

impl Assessment {
    /// Build assessment `index` of a request batch from its JSON object.
    pub fn from_value(index: usize, value: &Value) -> Result<Self, PredictionError> {
        let fields = Fields::of(index, value, "")?;
        Ok(Self {
            total_score: fields.number("totalScore")?,
            days_to_visit: fields.number("days_to_visit")?,
            date: fields.string("date")?,
            age: fields.number("age")?,
            subscores: Subscores::from_fields(&fields.object("subscores")?)?,
        })
    }

    /// Range advisories for the total score and every subscore.
    pub fn range_advisories(&self) -> Vec<String> {
        let mut notes = Vec::new();
        if !(0.0..=moca_ranges::TOTAL_MAX).contains(&self.total_score) {
            notes.push(format!(
                "totalScore = {} is outside 0-{}",
                self.total_score,
                moca_ranges::TOTAL_MAX
            ));
        }
        notes.extend(self.subscores.range_advisories());
        notes
    }
}

/// Parse a request body into the ordered assessment list.
///
/// `null` and `{}` count as "no assessments"; the orchestrator then reports
/// [`PredictionError::EmptyInput`].
pub fn parse_assessments(body: &[u8]) -> Result<Vec<Assessment>, PredictionError> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| PredictionError::MalformedPayload(format!("invalid JSON: {e}")))?;
    assessments_from_value(&value)
}

/// Same as [`parse_assessments`] for an already-decoded document.
pub fn assessments_from_value(value: &Value) -> Result<Vec<Assessment>, PredictionError> {
    match value {
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, item)| Assessment::from_value(i, item))
            .collect(),
        Value::Null => Ok(Vec::new()),
        Value::Object(map) if map.is_empty() => Ok(Vec::new()),
        _ => Err(PredictionError::MalformedPayload(
            "expected a JSON array of assessments".to_string(),
        )),
    }
}

// ============================================================================
// Field extraction
// ============================================================================

/// Typed accessor over one JSON object of a batch, tagging errors with the
/// item index and the dotted path of the field.
pub(crate) struct Fields<'a> {
    index: usize,
    prefix: String,
    map: &'a Map<String, Value>,
}

impl<'a> Fields<'a> {
    pub(crate) fn of(index: usize, value: &'a Value, prefix: &str) -> Result<Self, PredictionError> {
        match value {
            Value::Object(map) => Ok(Self {
                index,
                prefix: prefix.to_string(),
                map,
            }),
            other => Err(PredictionError::MalformedPayload(format!(
                "item {index}{} must be an object, got {}",
                if prefix.is_empty() { String::new() } else { format!(" field '{prefix}'") },
                json_type(other)
            ))),
        }
    }

    fn path(&self, key: &str) -> String {
        if self.prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}.{key}", self.prefix)
        }
    }

    fn require(&self, key: &str) -> Result<&'a Value, PredictionError> {
        self.map.get(key).ok_or_else(|| PredictionError::MissingField {
            index: self.index,
            field: self.path(key),
        })
    }

    pub(crate) fn number(&self, key: &str) -> Result<f64, PredictionError> {
        let value = self.require(key)?;
        value.as_f64().ok_or_else(|| {
            PredictionError::MalformedPayload(format!(
                "item {} field '{}' must be a number, got {}",
                self.index,
                self.path(key),
                json_type(value)
            ))
        })
    }

    pub(crate) fn string(&self, key: &str) -> Result<String, PredictionError> {
        let value = self.require(key)?;
        value.as_str().map(str::to_string).ok_or_else(|| {
            PredictionError::MalformedPayload(format!(
                "item {} field '{}' must be a string, got {}",
                self.index,
                self.path(key),
                json_type(value)
            ))
        })
    }

    pub(crate) fn object(&self, key: &str) -> Result<Fields<'a>, PredictionError> {
        let value = self.require(key)?;
        Fields::of(self.index, value, &self.path(key))
    }

    pub(crate) fn array(&self, key: &str) -> Result<&'a [Value], PredictionError> {
        let value = self.require(key)?;
        value.as_array().map(Vec::as_slice).ok_or_else(|| {
            PredictionError::MalformedPayload(format!(
                "field '{}' must be an array, got {}",
                self.path(key),
                json_type(value)
            ))
        })
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
