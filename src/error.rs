// Error handling module for the Newsdesk API
// Provides centralized error types and HTTP response conversion

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use tracing::{debug, error, warn};

use crate::auth::{error::body_rejection_status, AuthError};
use crate::mail::MailError;

/// Main error type for the profile, notification and contact endpoints
///
/// Each variant maps to a specific HTTP status code. Auth failures are carried
/// through unchanged so the caller sees the same messages the auth gate uses.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Request validation errors
    /// Maps to HTTP 400 Bad Request
    #[error("Validation failed: {0}")]
    ValidationError(#[from] validator::ValidationErrors),

    /// Body that could not be read as the expected JSON
    /// Maps to HTTP 400 Bad Request, or 413 when over the size limit
    #[error("Invalid request body: {0}")]
    InvalidBody(#[from] JsonRejection),

    /// Malformed input that is not a field-level validation failure
    /// Maps to HTTP 400 Bad Request
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Maps to HTTP 404 Not Found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Maps to HTTP 409 Conflict
    #[error("Conflict: {message}")]
    Conflict { message: String },

    /// Maps to HTTP 500, details are never sent to the client
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    /// Maps to HTTP 500, details are never sent to the client
    #[error("Mail error: {0}")]
    MailError(#[from] MailError),

    #[error(transparent)]
    Auth(#[from] AuthError),
}

/// Error response body: `{ "message": ..., "details"?: ... }`
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    /// Human-readable error message
    pub message: String,

    /// Optional field-level validation errors
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            details: None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Auth(auth_error) => auth_error.into_response(),
            other => {
                let (status, error_response) = other.to_error_response();
                (status, Json(error_response)).into_response()
            }
        }
    }
}

impl ApiError {
    /// Convert ApiError to HTTP status code and ErrorResponse
    ///
    /// Logs at error level for 500s, warn for conflicts, debug for expected client errors.
    fn to_error_response(&self) -> (StatusCode, ErrorResponse) {
        match self {
            ApiError::ValidationError(errors) => {
                debug!("Validation error: {:?}", errors);
                (
                    StatusCode::BAD_REQUEST,
                    ErrorResponse {
                        message: "Request validation failed".to_string(),
                        details: Some(
                            serde_json::to_value(errors).unwrap_or(serde_json::json!({})),
                        ),
                    },
                )
            }
            ApiError::InvalidBody(rejection) => {
                debug!("Rejected request body: {}", rejection);
                (
                    body_rejection_status(rejection),
                    ErrorResponse::new(rejection.body_text()),
                )
            }
            ApiError::BadRequest(message) => {
                debug!("Bad request: {}", message);
                (StatusCode::BAD_REQUEST, ErrorResponse::new(message.clone()))
            }
            ApiError::NotFound(message) => {
                debug!("Not found: {}", message);
                (StatusCode::NOT_FOUND, ErrorResponse::new(message.clone()))
            }
            ApiError::Conflict { message } => {
                warn!("Conflict error: {}", message);
                (StatusCode::CONFLICT, ErrorResponse::new(message.clone()))
            }
            ApiError::DatabaseError(db_error) => {
                error!("Database error: {:?}", db_error);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new("Server error"),
                )
            }
            ApiError::MailError(mail_error) => {
                error!("Mail error: {}", mail_error);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new("Server error"),
                )
            }
            ApiError::Auth(auth_error) => (
                auth_error.status_code(),
                ErrorResponse::new(auth_error.error_message()),
            ),
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::ValidationError(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::InvalidBody(rejection) => body_rejection_status(rejection),
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict { .. } => StatusCode::CONFLICT,
            ApiError::DatabaseError(_) | ApiError::MailError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::Auth(auth_error) => auth_error.status_code(),
        }
    }
}
