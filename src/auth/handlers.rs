// HTTP handlers for authentication endpoints

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use validator::Validate;

use crate::auth::{
    error::AuthError,
    middleware::CurrentAccount,
    models::{
        ChangePasswordRequest, ForgotPasswordRequest, LoginRequest, RegisterRequest,
        ResetPasswordRequest,
    },
};
use crate::AppState;

/// Handler for POST /api/v1/auth/login
/// Accepts a username or a linked email in `email`
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session token and account", body = crate::auth::models::AuthResponse),
        (status = 401, description = "Unknown account or wrong password", body = crate::error::ErrorResponse, example = json!({"message": "Invalid Credentials"}))
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<Value>, AuthError> {
    let Json(request) = payload?;
    request.validate()?;

    let response = state
        .account_service
        .login(&request.email, &request.password)
        .await?;

    Ok(Json(json!({ "data": response })))
}

/// Handler for POST /api/v1/auth/register
#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = crate::auth::models::RegisterResponse),
        (status = 400, description = "Invalid input or user type", body = crate::error::ErrorResponse, example = json!({"message": "Invalid User Type"})),
        (status = 409, description = "Handle already taken", body = crate::error::ErrorResponse, example = json!({"message": "User Already Exists"}))
    ),
    tag = "auth"
)]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), AuthError> {
    let Json(request) = payload?;
    request.validate()?;

    let response = state.account_service.register(request).await?;

    Ok((StatusCode::CREATED, Json(json!({ "data": response }))))
}

/// Handler for POST /api/v1/auth/forget-password
#[utoipa::path(
    post,
    path = "/api/v1/auth/forget-password",
    request_body = ForgotPasswordRequest,
    responses(
        (status = 200, description = "Reset secret mailed"),
        (status = 404, description = "Unknown account", body = crate::error::ErrorResponse, example = json!({"message": "User doesn't exist"})),
        (status = 500, description = "Secret stored but mail not sent", body = crate::error::ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn forget_password(
    State(state): State<AppState>,
    payload: Result<Json<ForgotPasswordRequest>, JsonRejection>,
) -> Result<Json<Value>, AuthError> {
    let Json(request) = payload?;
    request.validate()?;

    state
        .account_service
        .request_password_reset(&request.email)
        .await?;

    Ok(Json(json!({ "message": "Password reset email sent successfully" })))
}

/// Handler for POST /api/v1/auth/reset-password
#[utoipa::path(
    post,
    path = "/api/v1/auth/reset-password",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password replaced"),
        (status = 400, description = "Secret unknown, used or expired", body = crate::error::ErrorResponse, example = json!({"message": "The token is invalid or expired. Please request a new one."}))
    ),
    tag = "auth"
)]
pub async fn reset_password(
    State(state): State<AppState>,
    payload: Result<Json<ResetPasswordRequest>, JsonRejection>,
) -> Result<Json<Value>, AuthError> {
    let Json(request) = payload?;
    request.validate()?;

    state
        .account_service
        .complete_password_reset(&request.token, &request.password)
        .await?;

    Ok(Json(json!({ "message": "Password changed successfully" })))
}

/// Handler for POST /api/v1/auth/change-password
#[utoipa::path(
    post,
    path = "/api/v1/auth/change-password",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed"),
        (status = 401, description = "Not logged in or wrong current password", body = crate::error::ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "auth"
)]
pub async fn change_password(
    State(state): State<AppState>,
    CurrentAccount(profile): CurrentAccount,
    payload: Result<Json<ChangePasswordRequest>, JsonRejection>,
) -> Result<Json<Value>, AuthError> {
    let Json(request) = payload?;
    request.validate()?;

    state
        .account_service
        .change_password(
            profile.account.id,
            &request.current_password,
            &request.new_password,
        )
        .await?;

    Ok(Json(json!({ "message": "Password changed successfully" })))
}
