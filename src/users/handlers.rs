// HTTP handlers for the authenticated account's own resources

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

use crate::auth::middleware::CurrentAccount;
use crate::error::ApiError;
use crate::users::models::{
    AllowedNotificationsRequest, ContactUsRequest, ProfileResponse, UpdateProfileRequest,
};
use crate::AppState;

/// Handler for GET /api/v1/users
#[utoipa::path(
    get,
    path = "/api/v1/users",
    responses(
        (status = 200, description = "Profile of the authenticated account", body = ProfileResponse),
        (status = 401, description = "Not logged in", body = crate::error::ErrorResponse, example = json!({"message": "You are not logged in. Please login to get access"}))
    ),
    security(("bearer" = [])),
    tag = "users"
)]
pub async fn get_profile(CurrentAccount(profile): CurrentAccount) -> Json<Value> {
    Json(json!({ "data": ProfileResponse::from(profile) }))
}

/// Handler for PATCH /api/v1/users
#[utoipa::path(
    patch,
    path = "/api/v1/users",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Updated profile", body = ProfileResponse),
        (status = 400, description = "Invalid input", body = crate::error::ErrorResponse),
        (status = 409, description = "Email already in use", body = crate::error::ErrorResponse, example = json!({"message": "Email already in use by another user"}))
    ),
    security(("bearer" = [])),
    tag = "users"
)]
pub async fn update_profile(
    State(state): State<AppState>,
    CurrentAccount(profile): CurrentAccount,
    payload: Result<Json<UpdateProfileRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(request) = payload?;

    let updated = state
        .profile_service
        .update_profile(profile.account.id, request)
        .await?;

    Ok(Json(json!({ "data": ProfileResponse::from(updated) })))
}

/// Handler for DELETE /api/v1/users
#[utoipa::path(
    delete,
    path = "/api/v1/users",
    responses(
        (status = 200, description = "Account deleted")
    ),
    security(("bearer" = [])),
    tag = "users"
)]
pub async fn delete_profile(
    State(state): State<AppState>,
    CurrentAccount(profile): CurrentAccount,
) -> Result<Json<Value>, ApiError> {
    state.profile_service.delete_account(profile.account.id).await?;

    Ok(Json(json!({ "data": { "message": "User Deleted Successfully" } })))
}

/// Handler for GET /api/v1/users/notifications
#[utoipa::path(
    get,
    path = "/api/v1/users/notifications",
    responses(
        (status = 200, description = "Notifications, newest first", body = Vec<crate::users::models::NotificationResponse>)
    ),
    security(("bearer" = [])),
    tag = "users"
)]
pub async fn list_notifications(
    State(state): State<AppState>,
    CurrentAccount(profile): CurrentAccount,
) -> Result<Json<Value>, ApiError> {
    let notifications = state
        .profile_service
        .notifications(profile.account.id)
        .await?;

    Ok(Json(json!({ "data": notifications })))
}

/// Handler for PATCH /api/v1/users/notifications
#[utoipa::path(
    patch,
    path = "/api/v1/users/notifications",
    request_body = AllowedNotificationsRequest,
    responses(
        (status = 204, description = "Allowed notification kinds replaced"),
        (status = 400, description = "Missing list", body = crate::error::ErrorResponse, example = json!({"message": "Invalid input"}))
    ),
    security(("bearer" = [])),
    tag = "users"
)]
pub async fn modify_allowed_notifications(
    State(state): State<AppState>,
    CurrentAccount(profile): CurrentAccount,
    payload: Result<Json<AllowedNotificationsRequest>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Json(request) = payload?;

    state
        .profile_service
        .set_allowed_notifications(profile.account.id, request.allowed_notifications)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Handler for POST /api/v1/users/send-contact-us
#[utoipa::path(
    post,
    path = "/api/v1/users/send-contact-us",
    request_body = ContactUsRequest,
    responses(
        (status = 200, description = "Message relayed"),
        (status = 400, description = "Empty message", body = crate::error::ErrorResponse),
        (status = 500, description = "Mail delivery failed", body = crate::error::ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "users"
)]
pub async fn send_contact_us(
    State(state): State<AppState>,
    CurrentAccount(profile): CurrentAccount,
    payload: Result<Json<ContactUsRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(request) = payload?;

    state
        .profile_service
        .send_contact_us(&profile, request)
        .await?;

    Ok(Json(json!({ "message": "Message sent successfully" })))
}
