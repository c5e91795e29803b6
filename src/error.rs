//! Error handling module
//!
//! HTTP-facing errors of the gateway and their JSON response conversion.
//! Business failures never appear here: workers report them inside a
//! response envelope that is relayed with status 200.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::queue::QueueError;

/// Application-wide Result type
pub type AppResult<T> = Result<T, AppError>;

/// Application error types
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // Client errors (4xx)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Method not allowed: {0}")]
    MethodNotAllowed(String),

    #[error("Timed out waiting for a response")]
    Timeout,

    // Server errors (5xx)
    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
}

/// Error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            AppError::Timeout => StatusCode::REQUEST_TIMEOUT,
            AppError::Queue(_) | AppError::Serialization(_) | AppError::Config(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (error_code, details) = match &self {
            // 400 Bad Request
            AppError::InvalidRequest(msg) => ("invalid_request", Some(msg.clone())),

            // 404 Not Found
            AppError::NotFound(path) => ("not_found", Some(path.clone())),

            // 405 Method Not Allowed
            AppError::MethodNotAllowed(method) => ("method_not_allowed", Some(method.clone())),

            // 408 Request Timeout
            AppError::Timeout => ("request_timeout", None),

            // 500 Internal Server Error
            AppError::Queue(e) => {
                tracing::error!("Queue error: {:?}", e);
                ("queue_error", None)
            }
            AppError::Serialization(e) => {
                tracing::error!("Serialization error: {:?}", e);
                ("serialization_error", None)
            }
            AppError::Config(e) => {
                tracing::error!("Config error: {:?}", e);
                ("config_error", None)
            }
        };

        let body = ErrorResponse {
            error: self.to_string(),
            error_code: error_code.to_string(),
            details,
        };

        (self.status_code(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AppError::InvalidRequest("missing amount".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AppError::NotFound("/x".into()).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::MethodNotAllowed("PUT".into()).status_code(),
            StatusCode::METHOD_NOT_ALLOWED
        );
        assert_eq!(AppError::Timeout.status_code(), StatusCode::REQUEST_TIMEOUT);
        assert_eq!(
            AppError::Queue(QueueError::timeout("q", Duration::from_secs(1))).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_into_response_status() {
        let response = AppError::Timeout.into_response();
        assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);

        let response = AppError::InvalidRequest("bad".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
