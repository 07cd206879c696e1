//! Prediction output types.

use serde::{Deserialize, Serialize};

/// Per-visit model output, in the same order as the input assessments.
///
/// `future_cdr` and `future_confidence` are populated only on the final
/// visit of a sequence and serialize as `null` elsewhere.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub date: String,
    pub current_cdr: f64,
    pub current_confidence: f64,
    pub future_cdr: Option<f64>,
    pub future_confidence: Option<f64>,
    pub decline_rate: f64,
    /// 1-based position in the visit sequence
    pub visit_number: u32,
}

impl PredictionResult {
    pub fn has_projection(&self) -> bool {
        self.future_cdr.is_some() && self.future_confidence.is_some()
    }
}

/// Body returned in place of the result array when a batch fails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub error: String,
}

impl ErrorPayload {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_projection_serializes_as_null() {
        let result = PredictionResult {
            date: "2021-03-04".to_string(),
            current_cdr: 0.5,
            current_confidence: 0.8,
            future_cdr: None,
            future_confidence: None,
            decline_rate: 0.0,
            visit_number: 1,
        };
        let v = serde_json::to_value(&result).unwrap();
        assert!(v["future_cdr"].is_null());
        assert!(v["future_confidence"].is_null());
        assert_eq!(v["visit_number"], 1);
        assert!(!result.has_projection());
    }

    #[test]
    fn test_error_payload_shape() {
        let v = serde_json::to_value(ErrorPayload::new("boom")).unwrap();
        assert_eq!(v, serde_json::json!({"error": "boom"}));
    }
}
