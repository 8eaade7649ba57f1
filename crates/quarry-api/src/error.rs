//! API error types and HTTP response mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use quarry_core::Error as CoreError;

/// API result type.
pub type ApiResult<T> = Result<T, ApiError>;

/// Message returned when the prefix has no published snapshot.
pub const NO_SNAPSHOT_MESSAGE: &str = "no snapshot has been published yet";

/// Standard JSON error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorBody {
    /// Stable machine-readable error code.
    pub code: String,
    /// Human-readable message (safe for clients).
    pub message: String,
}

/// HTTP API error with stable machine-readable code.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl ApiError {
    /// Returns an error response for invalid input.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
    }

    /// Returns an error response for missing resources.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", message)
    }

    /// Returns an error response for an identifier that matched nothing.
    pub fn record_not_found(id: &str) -> Self {
        Self::not_found(format!("record not found: {id}"))
    }

    /// Returns an internal error response.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL", message)
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the human-readable error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the stable machine-readable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.code
    }

    fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ApiErrorBody {
                code: self.code.to_string(),
                message: self.message,
            }),
        )
            .into_response()
    }
}

impl From<CoreError> for ApiError {
    fn from(value: CoreError) -> Self {
        match value {
            CoreError::NoSnapshotFound { .. } => Self::not_found(NO_SNAPSHOT_MESSAGE),
            e @ CoreError::EmptySnapshot { .. } => Self::not_found(e.to_string()),
            CoreError::NotFound(message) => Self::not_found(message),
            CoreError::InvalidId { message }
            | CoreError::InvalidKey { message }
            | CoreError::InvalidInput(message) => Self::bad_request(message),
            e @ (CoreError::Storage { .. }
            | CoreError::Serialization { .. }
            | CoreError::PreconditionFailed { .. }
            | CoreError::Internal { .. }) => {
                tracing::error!(error = %e, "request failed");
                Self::internal("internal error")
            }
        }
    }
}
