//! Error handling module for the Bay backend.
//!
//! Provides centralized error types with mapping to HTTP status codes and the
//! `{code, title, message, status}` error envelope.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::form::{ParseError, VerifyError};

/// Error codes as constants to avoid stringly-typed errors.
pub mod codes {
    pub const UNAUTHORIZED: &str = "UNAUTHORIZED";
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
    pub const VERSION_MISMATCH: &str = "VERSION_MISMATCH";
    pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";
    pub const DATABASE_ERROR: &str = "DATABASE_ERROR";
    pub const BAD_REQUEST: &str = "BAD_REQUEST";
    pub const PARSE_ERROR: &str = "PARSE_ERROR";
    pub const SCHEMA_INVALID: &str = "SCHEMA_INVALID";
    pub const NO_FIELDS: &str = "NO_FIELDS";
    pub const MISSING_REQUIRED: &str = "MISSING_REQUIRED";
    pub const UNKNOWN_QUESTION: &str = "UNKNOWN_QUESTION";
    pub const TYPE_MISMATCH: &str = "TYPE_MISMATCH";
}

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    /// Authentication required
    Unauthorized(String),
    /// Resource not found
    NotFound(String),
    /// Validation error
    Validation(String),
    /// Optimistic concurrency conflict
    Conflict {
        message: String,
        current_version: i64,
    },
    /// Form content submitted by an owner cannot be parsed
    Document(ParseError),
    /// Submitted response rejected by verification
    Rejected(VerifyError),
    /// Database error
    Database(String),
    /// Internal server error
    Internal(String),
    /// Bad request
    BadRequest(String),
}

impl AppError {
    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict { .. } => StatusCode::CONFLICT,
            AppError::Document(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Rejected(_) => StatusCode::BAD_REQUEST,
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Unauthorized(_) => codes::UNAUTHORIZED,
            AppError::NotFound(_) => codes::NOT_FOUND,
            AppError::Validation(_) => codes::VALIDATION_ERROR,
            AppError::Conflict { .. } => codes::VERSION_MISMATCH,
            AppError::Document(_) => codes::PARSE_ERROR,
            AppError::Rejected(err) => match err {
                VerifyError::SchemaInvalid(_) => codes::SCHEMA_INVALID,
                VerifyError::NoFields => codes::NO_FIELDS,
                VerifyError::MissingRequired(_) => codes::MISSING_REQUIRED,
                VerifyError::UnknownQuestion(_) => codes::UNKNOWN_QUESTION,
                VerifyError::TypeMismatch { .. } => codes::TYPE_MISMATCH,
            },
            AppError::Database(_) => codes::DATABASE_ERROR,
            AppError::Internal(_) => codes::INTERNAL_ERROR,
            AppError::BadRequest(_) => codes::BAD_REQUEST,
        }
    }

    /// Short user-facing title.
    pub fn title(&self) -> &'static str {
        match self {
            AppError::Unauthorized(_) => "Unauthorized",
            AppError::NotFound(_) => "Not found",
            AppError::Validation(_) => "Validation failed",
            AppError::Conflict { .. } => "Version mismatch",
            AppError::Document(_) => "Invalid form content",
            AppError::Rejected(err) => match err {
                VerifyError::SchemaInvalid(_) => "Invalid response",
                VerifyError::NoFields => "Form has no questions",
                VerifyError::MissingRequired(_) => "Missing required answer",
                VerifyError::UnknownQuestion(_) => "Unknown question",
                VerifyError::TypeMismatch { .. } => "Answer type mismatch",
            },
            AppError::Database(_) | AppError::Internal(_) => "Something went wrong",
            AppError::BadRequest(_) => "Bad request",
        }
    }

    /// Get the error message.
    pub fn message(&self) -> String {
        match self {
            AppError::Unauthorized(msg) => msg.clone(),
            AppError::NotFound(msg) => msg.clone(),
            AppError::Validation(msg) => msg.clone(),
            AppError::Conflict { message, .. } => message.clone(),
            AppError::Document(err) => err.to_string(),
            AppError::Rejected(err) => err.to_string(),
            AppError::Database(msg) => msg.clone(),
            AppError::Internal(msg) => msg.clone(),
            AppError::BadRequest(msg) => msg.clone(),
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error_code(), self.message())
    }
}

impl std::error::Error for AppError {}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        tracing::error!("Database error: {:?}", err);
        AppError::Database(format!("Database error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        tracing::error!("JSON error: {:?}", err);
        AppError::BadRequest(format!("JSON error: {}", err))
    }
}

impl From<ParseError> for AppError {
    fn from(err: ParseError) -> Self {
        AppError::Document(err)
    }
}

impl From<VerifyError> for AppError {
    fn from(err: VerifyError) -> Self {
        tracing::debug!(kind = err.kind(), "Response rejected: {}", err);
        AppError::Rejected(err)
    }
}

/// Error details in the response envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: String,
    pub title: String,
    pub message: String,
    pub status: u16,
}

/// Error response envelope.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub success: bool,
    pub error: ErrorDetails,
    /// Version a client must send as `expectedVersion` to retry after a conflict
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_version: Option<i64>,
}

impl ErrorResponse {
    pub fn new(error: &AppError) -> Self {
        let current_version = match error {
            AppError::Conflict {
                current_version, ..
            } => Some(*current_version),
            _ => None,
        };

        Self {
            success: false,
            error: ErrorDetails {
                code: error.error_code().to_string(),
                title: error.title().to_string(),
                message: error.message(),
                status: error.status_code().as_u16(),
            },
            current_version,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse::new(&self);
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_errors_map_to_codes() {
        let err = AppError::from(VerifyError::MissingRequired("q1".to_string()));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.error_code(), codes::MISSING_REQUIRED);
        assert_eq!(err.message(), "Question q1 is required");

        let err = AppError::from(VerifyError::UnknownQuestion("ghost".to_string()));
        assert_eq!(err.error_code(), codes::UNKNOWN_QUESTION);
    }

    #[test]
    fn test_envelope_shape() {
        let body = ErrorResponse::new(&AppError::NotFound("Form f1 not found".to_string()));
        let value = serde_json::to_value(&body).unwrap();

        assert_eq!(value["success"], false);
        assert_eq!(value["error"]["code"], "NOT_FOUND");
        assert_eq!(value["error"]["title"], "Not found");
        assert_eq!(value["error"]["message"], "Form f1 not found");
        assert_eq!(value["error"]["status"], 404);
        assert!(value.get("currentVersion").is_none());
    }

    #[test]
    fn test_conflict_reports_current_version() {
        let err = AppError::Conflict {
            message: "Version mismatch: expected 1, current 3".to_string(),
            current_version: 3,
        };
        assert_eq!(err.status_code(), StatusCode::CONFLICT);

        let value = serde_json::to_value(ErrorResponse::new(&err)).unwrap();
        assert_eq!(value["currentVersion"], 3);
        assert_eq!(value["error"]["code"], "VERSION_MISMATCH");
        assert_eq!(value["error"].as_object().unwrap().len(), 4);
    }
}
