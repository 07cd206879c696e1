//! Liveness endpoint

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::ml_engine::ModelRole;

use super::ApiState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: String,
    pub uptime_seconds: u64,
    /// Roles of the loaded models
    pub models: Vec<ModelRole>,
}

/// GET /health - Liveness check
pub async fn health_check(State(state): State<ApiState>) -> Json<HealthResponse> {
    let models: Vec<ModelRole> = state.models.describe().into_iter().map(|m| m.role).collect();
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.uptime_secs(),
        models,
    })
}
