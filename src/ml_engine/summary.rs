//! Patient-level summaries.
//!
//! Collapses a prediction sequence to the headline numbers shown for a
//! patient and classifies them into a status and a confidence band.

use tracing::info;

use super::predictor::run_prediction;
use super::registry::ModelRegistry;
use super::timeline::prepare;
use super::PredictionError;
use crate::config::defaults::{CONFIDENCE_HIGH_BELOW, CONFIDENCE_MODERATE_BELOW, CRITICAL_CDR};
use crate::types::{
    CdrStatus, ConfidenceLabel, PatientPrediction, PatientRecord, PatientReport, PatientSummary,
    PredictionResult,
};

/// Status of a patient given current and projected CDR.
pub fn classify_status(current_cdr: f64, future_cdr: f64) -> CdrStatus {
    if current_cdr >= CRITICAL_CDR {
        CdrStatus::CriticalAlert
    } else if current_cdr > 0.0 || future_cdr > current_cdr {
        CdrStatus::Monitor
    } else {
        CdrStatus::Stable
    }
}

pub fn confidence_label(confidence: f64) -> ConfidenceLabel {
    if confidence < CONFIDENCE_MODERATE_BELOW {
        ConfidenceLabel::Moderate
    } else if confidence < CONFIDENCE_HIGH_BELOW {
        ConfidenceLabel::High
    } else {
        ConfidenceLabel::VeryHigh
    }
}

/// Summary of the latest visit, or `None` for an empty sequence.
pub fn summarize(results: &[PredictionResult]) -> Option<PatientSummary> {
    let latest = results.last()?;
    let future_cdr = latest.future_cdr.unwrap_or(0.0);
    Some(PatientSummary {
        current_cdr: latest.current_cdr,
        future_cdr,
        confidence: latest.current_confidence,
        decline_rate: latest.decline_rate,
        status: classify_status(latest.current_cdr, future_cdr),
        confidence_label: confidence_label(latest.current_confidence),
        visit_count: results.len(),
    })
}

/// Full pipeline for one stored patient record.
///
/// A record without tests yields an empty report rather than an error.
pub fn predict_patient(
    models: &ModelRegistry,
    record: &PatientRecord,
) -> Result<PatientReport, PredictionError> {
    let timeline = prepare(record)?;
    if timeline.is_empty() {
        return Ok(PatientReport {
            id: record.id.clone(),
            predictions: Vec::new(),
            summary: None,
        });
    }

    let results = run_prediction(models, &timeline.assessments)?;
    let summary = summarize(&results);

    if let Some(s) = &summary {
        info!(
            patient = record.id.as_deref().unwrap_or("-"),
            visits = s.visit_count,
            current_cdr = s.current_cdr,
            future_cdr = s.future_cdr,
            status = %s.status,
            "Patient prediction complete"
        );
    }

    let predictions = timeline
        .original_indices
        .into_iter()
        .zip(results)
        .map(|(test_index, result)| PatientPrediction { test_index, result })
        .collect();

    Ok(PatientReport {
        id: record.id.clone(),
        predictions,
        summary,
    })
}
