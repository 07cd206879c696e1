//! Response envelope for `/api/v1`.
//!
//! Success bodies are `{ "data": T, "meta": {...} }`; failures are
//! `{ "error": {...}, "meta": {...} }` with a machine-readable code. The
//! unversioned `/api/predict` endpoint keeps its bare array / `{"error"}` body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::ml_engine::PredictionError;

const API_VERSION: &str = "1";

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub api_version: &'static str,
    pub generated_at: DateTime<Utc>,
}

impl ResponseMeta {
    fn now() -> Self {
        Self {
            api_version: API_VERSION,
            generated_at: Utc::now(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Response {
        let body = Self {
            data,
            meta: ResponseMeta::now(),
        };
        (StatusCode::OK, axum::Json(body)).into_response()
    }
}

/// Failure classes reported to `/api/v1` clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    NotFound,
    EmptyInput,
    MissingField,
    MalformedPayload,
    ModelFailure,
    Internal,
}

impl ErrorCode {
    pub fn status(self) -> StatusCode {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::EmptyInput | Self::MissingField | Self::MalformedPayload => {
                StatusCode::BAD_REQUEST
            }
            Self::ModelFailure | Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: ErrorCode,
    pub message: String,
    /// Offending field for [`ErrorCode::MissingField`]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// Test position for [`ErrorCode::MissingField`]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct ApiErrorResponse {
    pub error: ErrorDetail,
    pub meta: ResponseMeta,
}

impl ApiErrorResponse {
    fn respond(error: ErrorDetail) -> Response {
        let status = error.code.status();
        let body = Self {
            error,
            meta: ResponseMeta::now(),
        };
        (status, axum::Json(body)).into_response()
    }

    fn plain(code: ErrorCode, message: impl Into<String>) -> Response {
        Self::respond(ErrorDetail {
            code,
            message: message.into(),
            field: None,
            index: None,
        })
    }

    pub fn not_found(message: impl Into<String>) -> Response {
        Self::plain(ErrorCode::NotFound, message)
    }

    pub fn internal(message: impl Into<String>) -> Response {
        Self::plain(ErrorCode::Internal, message)
    }

    /// Map a prediction failure to its code and HTTP status.
    pub fn from_prediction(err: &PredictionError) -> Response {
        let message = err.to_string();
        match err {
            PredictionError::EmptyInput => Self::plain(ErrorCode::EmptyInput, message),
            PredictionError::MissingField { index, field } => Self::respond(ErrorDetail {
                code: ErrorCode::MissingField,
                message,
                field: Some(field.clone()),
                index: Some(*index),
            }),
            PredictionError::MalformedPayload(_) => {
                Self::plain(ErrorCode::MalformedPayload, message)
            }
            PredictionError::Model(_) => Self::plain(ErrorCode::ModelFailure, message),
        }
    }
}
