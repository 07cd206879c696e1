//! REST API module using Axum
//!
//! Provides HTTP endpoints for CDR inference:
//! - `/api/predict` accepting a bare assessment array
//! - `/api/v1` with the `{data, meta}` envelope for patient records and model metadata
//! - `/health` for liveness probes

pub mod envelope;
pub mod handlers;
mod routes;

pub use handlers::ApiState;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method};
use axum::response::Response;
use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use envelope::ApiErrorResponse;

/// Build a CORS layer that is restrictive by default (same-origin only).
///
/// Origins listed in `[server] cors_origins` are allowed for cross-origin use
/// (e.g. `http://localhost:5173` for a frontend dev server).
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    if origins.is_empty() {
        return base;
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| o.trim().parse().ok())
        .collect();
    tracing::info!(origins = ?origins, "CORS: allowing configured origins");
    base.allow_origin(allowed)
}

async fn not_found() -> Response {
    ApiErrorResponse::not_found("no such endpoint")
}

/// Create the complete application router.
pub fn create_app(state: ApiState, server: &ServerConfig) -> Router {
    let cors = build_cors_layer(&server.cors_origins);

    Router::new()
        .nest("/api/v1", routes::api_routes(state.clone()))
        .merge(routes::root_routes(state))
        .fallback(not_found)
        // Middleware
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(server.max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors)
}
