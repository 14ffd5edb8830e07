//! Error types for the logpost server.

use std::net::SocketAddr;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use logpost_core::LogError;
use serde::Serialize;
use thiserror::Error;

/// Result type alias for server startup and configuration.
pub type ServerResult<T> = Result<T, ServerError>;

/// Result type alias for request handlers.
pub type ApiResult<T> = Result<T, ApiError>;

/// Errors raised while configuring or running the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Failed to bind to the specified address.
    #[error("failed to bind to {0}: {1}")]
    BindFailed(SocketAddr, std::io::Error),

    /// The configuration is unusable.
    #[error("configuration error: {0}")]
    Config(String),

    /// The message store could not be prepared.
    #[error("store initialization failed: {0}")]
    Store(#[from] LogError),

    /// The server stopped unexpectedly.
    #[error("server error: {0}")]
    Internal(String),
}

/// Errors returned to HTTP clients.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request was malformed or failed validation.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// No such route or resource.
    #[error("not found: {0}")]
    NotFound(String),

    /// The message store failed.
    #[error("backend error: {0}")]
    Backend(String),

    /// Anything else.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Backend(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable kind.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "invalid_request",
            Self::NotFound(_) => "not_found",
            Self::Backend(_) => "backend_error",
            Self::Internal(_) => "internal_error",
        }
    }
}

impl From<LogError> for ApiError {
    fn from(err: LogError) -> Self {
        match err {
            LogError::Backend(message) => Self::Backend(message),
            LogError::Serialization(e) => Self::Internal(e.to_string()),
            client => Self::InvalidRequest(client.to_string()),
        }
    }
}

/// JSON error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: &'static str,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: self.kind(),
            message: self.to_string(),
        };

        let json = serde_json::to_string(&body).unwrap_or_else(|_| {
            r#"{"error":"internal_error","message":"failed to serialize error"}"#.to_string()
        });

        (
            self.status(),
            [("content-type", "application/json")],
            json,
        )
            .into_response()
    }
}
