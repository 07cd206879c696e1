//! Batch inference over one patient's visit sequence.
//!
//! Every visit is classified by the current-state model. Only the final visit
//! additionally receives a one-year projection, using the same features plus a
//! fixed 365-day gap. A batch either succeeds as a whole or fails; partial
//! results are never returned.

use tracing::{debug, warn};

use super::features::derive_features;
use super::registry::ModelRegistry;
use super::PredictionError;
use crate::config::defaults::PROJECTION_GAP_DAYS;
use crate::types::{parse_assessments, Assessment, PredictionResult};

/// Run both models over an ordered visit sequence.
pub fn run_prediction(
    models: &ModelRegistry,
    assessments: &[Assessment],
) -> Result<Vec<PredictionResult>, PredictionError> {
    if assessments.is_empty() {
        return Err(PredictionError::EmptyInput);
    }

    for (index, assessment) in assessments.iter().enumerate() {
        for note in assessment.range_advisories() {
            warn!(visit = index, date = %assessment.date, "Score out of range: {}", note);
        }
    }

    let visits = derive_features(assessments);
    let last = visits.len() - 1;

    let mut results = Vec::with_capacity(visits.len());
    for (i, (assessment, visit)) in assessments.iter().zip(&visits).enumerate() {
        let current = models.current().predict(visit.features.as_slice())?;

        let (future_cdr, future_confidence) = if i == last {
            let row = visit.features.with_projection_gap(PROJECTION_GAP_DAYS);
            let projected = models.projection().predict(&row)?;
            (Some(projected.label), Some(projected.confidence))
        } else {
            (None, None)
        };

        results.push(PredictionResult {
            date: assessment.date.clone(),
            current_cdr: current.label,
            current_confidence: current.confidence,
            future_cdr,
            future_confidence,
            decline_rate: visit.decline_rate,
            visit_number: visit.visit_number,
        });
    }

    debug!(visits = results.len(), "Prediction batch complete");
    Ok(results)
}

/// Parse a raw JSON request body and run it.
pub fn predict_payload(
    models: &ModelRegistry,
    body: &[u8],
) -> Result<Vec<PredictionResult>, PredictionError> {
    let assessments = parse_assessments(body)?;
    run_prediction(models, &assessments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml_engine::registry::tests::stump_registry;
    use serde_json::json;

    fn visit(date: &str, total: f64, days: f64) -> serde_json::Value {
        json!({
            "date": date,
            "totalScore": total,
            "days_to_visit": days,
            "age": 72,
            "subscores": {
                "visuospatialExec": 4, "naming": 3, "attention": 5, "language": 2,
                "abstraction": 2, "memory_recall": 3, "orientation": 6
            }
        })
    }

    fn body(visits: &[serde_json::Value]) -> Vec<u8> {
        serde_json::to_vec(visits).unwrap()
    }

    #[test]
    fn test_single_visit_has_projection() {
        let models = stump_registry();
        let results = predict_payload(&models, &body(&[visit("2021-05-01", 26.0, 0.0)])).unwrap();

        assert_eq!(results.len(), 1);
        let r = &results[0];
        assert_eq!(r.date, "2021-05-01");
        assert_eq!(r.visit_number, 1);
        assert_eq!(r.decline_rate, 0.0);
        assert_eq!(r.current_cdr, 0.0);
        assert!(r.current_confidence > 0.0 && r.current_confidence <= 1.0);
        assert!(r.has_projection());
    }

    #[test]
    fn test_only_last_visit_is_projected() {
        let models = stump_registry();
        let results = predict_payload(
            &models,
            &body(&[
                visit("2020-01-01", 28.0, 0.0),
                visit("2021-02-04", 24.0, 400.0),
                visit("2022-03-01", 20.0, 790.0),
            ]),
        )
        .unwrap();

        assert_eq!(results.len(), 3);
        assert!(!results[0].has_projection());
        assert!(results[0].future_cdr.is_none());
        assert!(!results[1].has_projection());
        assert!(results[2].has_projection());
        assert_eq!(
            results.iter().map(|r| r.visit_number).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert_eq!(
            results.iter().map(|r| r.date.as_str()).collect::<Vec<_>>(),
            vec!["2020-01-01", "2021-02-04", "2022-03-01"]
        );
    }

    #[test]
    fn test_decline_rate_echoed_per_visit() {
        let models = stump_registry();
        let results = predict_payload(
            &models,
            &body(&[visit("a", 28.0, 0.0), visit("b", 24.0, 400.0)]),
        )
        .unwrap();
        assert_eq!(results[0].decline_rate, 0.0);
        assert!((results[1].decline_rate - (-3.6525)).abs() < 1e-12);
    }

    #[test]
    fn test_labels_follow_total_score() {
        let models = stump_registry();
        let results = predict_payload(
            &models,
            &body(&[visit("a", 28.0, 0.0), visit("b", 20.0, 365.0), visit("c", 12.0, 730.0)]),
        )
        .unwrap();
        assert_eq!(results[0].current_cdr, 0.0);
        assert_eq!(results[1].current_cdr, 0.5);
        assert_eq!(results[2].current_cdr, 1.0);
        assert_eq!(results[2].future_cdr, Some(1.0));
    }

    #[test]
    fn test_empty_batch() {
        let models = stump_registry();
        assert!(matches!(
            predict_payload(&models, b"[]"),
            Err(PredictionError::EmptyInput)
        ));
        assert!(matches!(
            run_prediction(&models, &[]),
            Err(PredictionError::EmptyInput)
        ));
    }

    #[test]
    fn test_missing_field_fails_whole_batch() {
        let models = stump_registry();
        let mut broken = visit("b", 24.0, 400.0);
        broken.as_object_mut().unwrap().remove("subscores");
        let err = predict_payload(&models, &body(&[visit("a", 28.0, 0.0), broken])).unwrap_err();
        assert!(matches!(err, PredictionError::MissingField { index: 1, .. }));
    }

    #[test]
    fn test_out_of_range_scores_still_predicted() {
        let models = stump_registry();
        let mut odd = visit("a", 35.0, 0.0);
        odd["subscores"]["naming"] = json!(9);
        let results = predict_payload(&models, &body(&[odd])).unwrap();
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn test_deterministic() {
        let models = stump_registry();
        let payload = body(&[visit("a", 27.0, 0.0), visit("b", 23.0, 200.0)]);
        let first = predict_payload(&models, &payload).unwrap();
        let second = predict_payload(&models, &payload).unwrap();
        assert_eq!(first, second);
    }
}
