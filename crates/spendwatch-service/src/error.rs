//! API error types and responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use spendwatch_core::ValidationError;
use spendwatch_store::StoreError;

/// Message returned for any malformed path input.
pub const INVALID_DATA_FORMAT: &str = "Invalid data format";

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Resource not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Bad request - invalid input or a rejected write.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Conflict - resource already exists.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The database is unreachable or a statement failed.
    #[error("storage error: {0}")]
    Storage(String),
}

/// JSON message body used for every non-data response.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    /// Human readable message.
    pub message: String,
}

impl MessageResponse {
    /// Create a message body.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::Conflict(msg) => (StatusCode::CONFLICT, msg),
            Self::Storage(msg) => {
                tracing::error!(error = %msg, "Storage error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Database error: {msg}"),
                )
            }
        };

        (status, Json(MessageResponse { message })).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict { entity, id } => {
                Self::Conflict(format!("{entity} already exists: {id}"))
            }
            StoreError::Overflow(what) => {
                Self::Storage(format!("{what} exceeds the representable decimal range"))
            }
            StoreError::Unavailable(msg)
            | StoreError::Database(msg)
            | StoreError::Serialization(msg) => Self::Storage(msg),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        tracing::debug!(error = %err, "Rejected request input");
        Self::BadRequest(INVALID_DATA_FORMAT.to_string())
    }
}
