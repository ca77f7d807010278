// Authentication and credential-lifecycle error types

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::{debug, error, warn};

use crate::error::ErrorResponse;
use crate::mail::MailError;

/// Errors raised by the hasher, token service, auth gate and account lifecycle
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Body missing, not JSON, wrong shape or over the size limit
    #[error("Invalid request body: {0}")]
    InvalidBody(#[from] JsonRejection),

    /// Unknown handle and wrong password are deliberately indistinguishable
    #[error("Invalid Credentials")]
    InvalidCredentials,

    #[error("User Already Exists")]
    DuplicateAccount,

    #[error("Invalid User Type")]
    InvalidAccountType,

    #[error("User doesn't exist")]
    AccountNotFound,

    // Auth gate branches
    #[error("Missing or non-bearer authorization header")]
    MissingToken,

    #[error("Malformed session token")]
    TokenMalformed,

    #[error("Expired session token")]
    TokenExpired,

    #[error("Account behind session token no longer exists")]
    AccountGone,

    #[error("Password reset token is invalid or expired")]
    ResetTokenInvalidOrExpired,

    /// A freshly minted reset secret's digest is already held by another live token
    #[error("Reset secret collides with a live token")]
    ResetSecretCollision,

    /// The reset record was stored but the email carrying the secret was not sent
    #[error("Password reset email delivery failed: {0}")]
    ResetDeliveryFailed(MailError),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Stored password hash is malformed")]
    HashFormat,

    #[error("Password hashing error: {0}")]
    PasswordHashError(String),

    #[error("Token generation error: {0}")]
    TokenGenerationError(String),
}

impl From<sqlx::Error> for AuthError {
    fn from(err: sqlx::Error) -> Self {
        AuthError::DatabaseError(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AuthError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AuthError::ValidationError(errors.to_string())
    }
}

impl AuthError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AuthError::InvalidBody(rejection) => body_rejection_status(rejection),
            AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AuthError::DuplicateAccount => StatusCode::CONFLICT,
            AuthError::InvalidAccountType => StatusCode::BAD_REQUEST,
            AuthError::AccountNotFound => StatusCode::NOT_FOUND,
            AuthError::MissingToken
            | AuthError::TokenMalformed
            | AuthError::TokenExpired
            | AuthError::AccountGone => StatusCode::UNAUTHORIZED,
            AuthError::ResetTokenInvalidOrExpired => StatusCode::BAD_REQUEST,
            AuthError::ResetDeliveryFailed(_)
            | AuthError::ResetSecretCollision
            | AuthError::DatabaseError(_)
            | AuthError::HashFormat
            | AuthError::PasswordHashError(_)
            | AuthError::TokenGenerationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get a descriptive error message for this error
    /// This message is safe to send to clients (no sensitive data)
    pub fn error_message(&self) -> String {
        match self {
            AuthError::ValidationError(msg) => msg.clone(),
            AuthError::InvalidBody(rejection) => rejection.body_text(),
            AuthError::InvalidCredentials => "Invalid Credentials".to_string(),
            AuthError::DuplicateAccount => "User Already Exists".to_string(),
            AuthError::InvalidAccountType => "Invalid User Type".to_string(),
            AuthError::AccountNotFound => "User doesn't exist".to_string(),
            AuthError::MissingToken => {
                "You are not logged in. Please login to get access".to_string()
            }
            AuthError::TokenMalformed => "Invalid Token, Login again".to_string(),
            AuthError::TokenExpired => "Your session token expired, Login again".to_string(),
            AuthError::AccountGone => {
                "The user belonging to this session no longer exists".to_string()
            }
            AuthError::ResetTokenInvalidOrExpired => {
                "The token is invalid or expired. Please request a new one.".to_string()
            }
            AuthError::ResetDeliveryFailed(_) => {
                "The reset token was created but the email could not be sent. Please try again."
                    .to_string()
            }
            AuthError::ResetSecretCollision
            | AuthError::DatabaseError(_)
            | AuthError::HashFormat
            | AuthError::PasswordHashError(_)
            | AuthError::TokenGenerationError(_) => "Server error".to_string(),
        }
    }
}

/// Oversized bodies keep their 413; every other rejection is a plain bad request
pub(crate) fn body_rejection_status(rejection: &JsonRejection) -> StatusCode {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        StatusCode::PAYLOAD_TOO_LARGE
    } else {
        StatusCode::BAD_REQUEST
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            error!("Auth request failed: {}", self);
        } else if status == StatusCode::UNAUTHORIZED {
            warn!("Rejected request: {}", self);
        } else {
            debug!("Auth client error: {}", self);
        }

        (status, Json(ErrorResponse::new(self.error_message()))).into_response()
    }
}
