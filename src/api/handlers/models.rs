//! Model metadata endpoint

use axum::extract::State;
use axum::response::Response;

use crate::api::envelope::ApiResponse;

use super::ApiState;

/// GET /api/v1/models - Describe the loaded current and projection models
pub async fn get_models(State(state): State<ApiState>) -> Response {
    ApiResponse::ok(state.models.describe())
}
