//! Error types and API response structures

use super::codes::ErrorCode;
use http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

/// Application error with structured error code and details
///
/// Every engine error is converted into this type before it leaves the
/// process, so HTTP clients see a stable numeric code plus optional context
/// such as the offending position key.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct AppError {
    /// The error code identifying the type of error
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
    /// Optional additional details (position keys, quantities, ...)
    pub details: Option<HashMap<String, Value>>,
}

impl AppError {
    /// Create a new error with the default message for the error code
    pub fn new(code: ErrorCode) -> Self {
        Self {
            message: code.message().to_string(),
            code,
            details: None,
        }
    }

    /// Create a new error with a custom message
    pub fn with_message(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Add a detail entry to this error
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }

    /// Get the HTTP status code for this error
    pub fn http_status(&self) -> StatusCode {
        self.code.http_status()
    }
}

/// Error body returned by the HTTP surface
///
/// - `code`: Error code
/// - `message`: Human-readable message
/// - `details`: Additional error details
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse {
    pub code: u16,
    /// Human-readable message
    pub message: String,
    /// Additional error details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<HashMap<String, Value>>,
}

impl ApiResponse {
    /// Create an error response from an AppError
    pub fn error(err: &AppError) -> Self {
        Self {
            code: err.code.code(),
            message: err.message.clone(),
            details: err.details.clone(),
        }
    }
}

/// Type alias for Result with AppError
pub type AppResult<T> = Result<T, AppError>;

// ===== Axum Integration =====

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        use axum::Json;

        let status = self.http_status();
        let body = ApiResponse::error(&self);

        // Log system errors
        if matches!(self.code.category(), super::category::ErrorCategory::System) {
            tracing::error!(
                code = %self.code,
                message = %self.message,
                "System error occurred"
            );
        }

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_new() {
        let err = AppError::new(ErrorCode::ShelfNotFound);
        assert_eq!(err.code, ErrorCode::ShelfNotFound);
        assert_eq!(err.message, "Shelf not found");
        assert!(err.details.is_none());
    }

    #[test]
    fn test_app_error_with_detail() {
        let err = AppError::new(ErrorCode::LocationBusy)
            .with_detail("key", "1/0/0")
            .with_detail("role", "source");

        let details = err.details.unwrap();
        assert_eq!(details.get("key").unwrap(), "1/0/0");
        assert_eq!(details.get("role").unwrap(), "source");
    }

    #[test]
    fn test_app_error_http_status() {
        assert_eq!(
            AppError::new(ErrorCode::DuplicateShelf).http_status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::with_message(ErrorCode::StoreUnavailable, "connection reset").http_status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_api_response_error() {
        let err = AppError::new(ErrorCode::SameLocation).with_detail("key", "1/0/0");
        let response = ApiResponse::error(&err);

        assert_eq!(response.code, 6006);
        assert!(response.details.is_some());
    }

    #[test]
    fn test_api_response_error_serialize() {
        let err = AppError::new(ErrorCode::ShelfNotEmpty);
        let json = serde_json::to_string(&ApiResponse::error(&err)).unwrap();
        assert!(json.contains("\"code\":7005"));
        assert!(json.contains("\"message\":\"Shelf still holds products\""));
        assert!(!json.contains("details"));
    }
}
