//! API route definitions
//!
//! - /api/predict - raw assessment-batch prediction
//! - /api/v1/patients/predict - patient-record prediction with summary
//! - /api/v1/models - loaded model metadata
//! - /health - liveness

use axum::{routing::{get, post}, Router};

use super::handlers::{self, ApiState};

/// Versioned API routes, nested under `/api/v1`.
pub fn api_routes(state: ApiState) -> Router {
    Router::new()
        .route("/patients/predict", post(handlers::predict_patient_record))
        .route("/models", get(handlers::get_models))
        .with_state(state)
}

/// Unversioned routes at the root: health and the bare prediction endpoint.
pub fn root_routes(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/api/predict", post(handlers::predict_assessments))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml_engine::registry::tests::stump_registry;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn create_test_state() -> ApiState {
        ApiState::new(Arc::new(stump_registry()))
    }

    fn post_json(uri: &str, body: Vec<u8>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn assessment(date: &str, total: f64, days: f64) -> Value {
        json!({
            "date": date, "totalScore": total, "days_to_visit": days, "age": 74,
            "subscores": {
                "visuospatialExec": 4, "naming": 3, "attention": 5, "language": 2,
                "abstraction": 2, "memory_recall": 3, "orientation": 6
            }
        })
    }

    #[tokio::test]
    async fn test_root_routes_health() {
        let app = root_routes(create_test_state());

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let v = body_json(response).await;
        assert_eq!(v["status"], "ok");
        assert_eq!(v["models"], json!(["current", "projection"]));
        assert!(v.get("models_loaded").is_none());
    }

    #[tokio::test]
    async fn test_predict_returns_result_array() {
        let app = root_routes(create_test_state());
        let body = serde_json::to_vec(&json!([
            assessment("2020-01-01", 28.0, 0.0),
            assessment("2021-02-04", 24.0, 400.0)
        ]))
        .unwrap();

        let response = app.oneshot(post_json("/api/predict", body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let v = body_json(response).await;
        let results = v.as_array().unwrap();
        assert_eq!(results.len(), 2);
        assert!(results[0]["future_cdr"].is_null());
        assert!(results[1]["future_cdr"].is_number());
        assert_eq!(results[1]["visit_number"], 2);
    }

    #[tokio::test]
    async fn test_predict_empty_array_is_ok_with_error() {
        let app = root_routes(create_test_state());

        let response = app
            .oneshot(post_json("/api/predict", b"[]".to_vec()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!({"error": "No assessment data provided"})
        );
    }

    #[tokio::test]
    async fn test_predict_malformed_json_is_500() {
        let app = root_routes(create_test_state());

        let response = app
            .oneshot(post_json("/api/predict", b"[{".to_vec()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body_json(response).await["error"].is_string());
    }

    #[tokio::test]
    async fn test_api_routes_models() {
        let app = api_routes(create_test_state());

        let response = app
            .oneshot(Request::builder().uri("/models").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let v = body_json(response).await;
        assert_eq!(v["data"][0]["role"], "current");
        assert_eq!(v["data"][1]["num_features"], 19);
        assert_eq!(v["data"][0]["num_trees"], 3);
    }

    #[tokio::test]
    async fn test_api_routes_patient_predict() {
        let app = api_routes(create_test_state());
        let record = json!({
            "dob": "1950-03-01",
            "mocaTests": [
                { "date": "2022-03-01", "totalScore": 21,
                  "subscores": assessment("", 0.0, 0.0)["subscores"].clone() },
                { "date": "2021-03-01", "totalScore": 26,
                  "subscores": assessment("", 0.0, 0.0)["subscores"].clone() }
            ]
        });

        let response = app
            .oneshot(post_json("/patients/predict", serde_json::to_vec(&record).unwrap()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let v = body_json(response).await;
        assert_eq!(v["predictions"][0]["test_index"], 1);
        assert_eq!(v["predictions"][1]["test_index"], 0);
        assert_eq!(v["summary"]["current_cdr"], 0.5);
        assert_eq!(v["summary"]["status"], "Monitor");
    }

    #[tokio::test]
    async fn test_api_routes_patient_missing_dob_is_400() {
        let app = api_routes(create_test_state());

        let response = app
            .oneshot(post_json("/patients/predict", br#"{"mocaTests": []}"#.to_vec()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let v = body_json(response).await;
        assert_eq!(v["error"]["code"], "MISSING_FIELD");
        assert_eq!(v["error"]["field"], "dob");
    }
}
