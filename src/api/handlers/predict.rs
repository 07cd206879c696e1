//! Assessment-batch prediction endpoint

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::{error, warn};

use crate::ml_engine::{predict_payload, PredictionError};
use crate::types::ErrorPayload;

use super::{run_blocking, ApiState};

/// Status and `{"error"}` body for a failed batch.
///
/// Empty input is answered with 200 so callers can treat it as "no result".
pub fn prediction_error_response(err: &PredictionError) -> Response {
    let status = if err.is_server_error() {
        error!(error = %err, "Prediction failed");
        StatusCode::INTERNAL_SERVER_ERROR
    } else {
        warn!("Prediction requested with no assessments");
        StatusCode::OK
    };
    (status, Json(ErrorPayload::new(err.to_string()))).into_response()
}

/// POST /api/predict - Predict CDR for an ordered assessment array
///
/// The body is taken as raw bytes so malformed JSON is reported in the same
/// `{"error"}` shape as every other failure.
pub async fn predict_assessments(State(state): State<ApiState>, body: Bytes) -> Response {
    let models = Arc::clone(&state.models);
    match run_blocking(move || predict_payload(&models, &body)).await {
        Ok(Ok(results)) => Json(results).into_response(),
        Ok(Err(e)) => prediction_error_response(&e),
        Err(msg) => {
            error!("{}", msg);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorPayload::new(msg)),
            )
                .into_response()
        }
    }
}
