//! API error types with structured JSON responses.
//!
//! The ingestion and query taxonomies map onto distinct machine codes so
//! clients can tell every failure case apart.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::lifecycle::IngestError;
use crate::query::QueryError;

/// Structured error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
}

/// API-level errors with HTTP status mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    // Ingestion-time
    #[error("Unsupported upload format: {0}")]
    FormatRejected(String),
    #[error("Could not persist upload: {0}")]
    PersistFailed(String),
    #[error("Could not decode dataset: {0}")]
    DecodeFailed(String),
    #[error("Could not fetch dataset: {0}")]
    FetchFailed(String),
    // Query-time
    #[error("Question cannot be empty")]
    EmptyQuestion,
    #[error("No dataset loaded")]
    NoData,
    #[error("Reasoning engine unavailable: {0}")]
    AgentUnavailable(String),
    #[error("Reasoning engine failed: {0}")]
    EngineFailure(String),
    // Transport glue
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ApiError::FormatRejected(detail) => (
                StatusCode::BAD_REQUEST,
                "FORMAT_REJECTED",
                format!("Only CSV/TSV files are accepted: {detail}"),
            ),
            ApiError::PersistFailed(detail) => {
                tracing::error!(detail, "Upload persist failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "PERSIST_FAILED",
                    "Could not persist the upload".to_string(),
                )
            }
            ApiError::DecodeFailed(detail) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "DECODE_FAILED",
                detail.clone(),
            ),
            ApiError::FetchFailed(detail) => (
                StatusCode::BAD_GATEWAY,
                "FETCH_FAILED",
                detail.clone(),
            ),
            ApiError::EmptyQuestion => (
                StatusCode::BAD_REQUEST,
                "EMPTY_QUESTION",
                "Question cannot be empty".to_string(),
            ),
            ApiError::NoData => (
                StatusCode::SERVICE_UNAVAILABLE,
                "NO_DATA",
                "No dataset has been loaded".to_string(),
            ),
            ApiError::AgentUnavailable(detail) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "ENGINE_UNBOUND",
                detail.clone(),
            ),
            ApiError::EngineFailure(detail) => (
                StatusCode::BAD_GATEWAY,
                "ENGINE_FAILURE",
                detail.clone(),
            ),
            ApiError::BadRequest(detail) => (
                StatusCode::BAD_REQUEST,
                "BAD_REQUEST",
                detail.clone(),
            ),
            ApiError::Internal(detail) => {
                tracing::error!(detail, "API internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = ErrorBody {
            error: ErrorDetail { code, message },
        };
        (status, Json(body)).into_response()
    }
}

impl From<IngestError> for ApiError {
    fn from(err: IngestError) -> Self {
        match err {
            IngestError::FormatRejected(name) => ApiError::FormatRejected(name),
            IngestError::PersistFailed(detail) => ApiError::PersistFailed(detail),
            IngestError::DecodeFailed(e) => ApiError::DecodeFailed(e.to_string()),
            IngestError::FetchFailed(detail) => ApiError::FetchFailed(detail),
            IngestError::Internal(detail) => ApiError::Internal(detail),
        }
    }
}

impl From<QueryError> for ApiError {
    fn from(err: QueryError) -> Self {
        match err {
            QueryError::EmptyQuestion => ApiError::EmptyQuestion,
            QueryError::NoData => ApiError::NoData,
            QueryError::AgentUnavailable(detail) => ApiError::AgentUnavailable(detail),
            QueryError::EngineFailure(detail) => ApiError::EngineFailure(detail),
            QueryError::Internal(detail) => ApiError::Internal(detail),
        }
    }
}
