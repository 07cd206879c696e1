//! Patient-record prediction endpoint

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::error;

use crate::api::envelope::ApiErrorResponse;
use crate::ml_engine::{predict_patient, PredictionError};
use crate::types::PatientRecord;

use super::{run_blocking, ApiState};

/// POST /api/v1/patients/predict - Predict from a stored patient record
///
/// Tests may arrive in any order; each prediction carries the `test_index`
/// of its test in the request.
pub async fn predict_patient_record(State(state): State<ApiState>, body: Bytes) -> Response {
    let record = match PatientRecord::parse(&body) {
        Ok(record) => record,
        Err(e) => return ApiErrorResponse::from_prediction(&e),
    };

    let models = Arc::clone(&state.models);
    match run_blocking(move || predict_patient(&models, &record)).await {
        Ok(Ok(report)) => Json(report).into_response(),
        Ok(Err(e @ PredictionError::Model(_))) => {
            error!(error = %e, "Patient prediction failed");
            ApiErrorResponse::from_prediction(&e)
        }
        Ok(Err(e)) => ApiErrorResponse::from_prediction(&e),
        Err(msg) => {
            error!("{}", msg);
            ApiErrorResponse::internal(msg)
        }
    }
}
