use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::auth::models::{AccountProfile, Interest, Role};
use crate::validation::{validate_not_blank, validate_phone_number, validate_positive_ids};

/// Profile view of the authenticated account (no credential material)
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub id: Uuid,
    pub username: String,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub account_type: i16,
    pub is_first_login: bool,
    pub status_id: i32,
    pub role: Option<Role>,
    pub field_of_interest: Vec<Interest>,
    pub allowed_notifications: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl From<AccountProfile> for ProfileResponse {
    fn from(profile: AccountProfile) -> Self {
        let account = profile.account;
        Self {
            id: account.id,
            username: account.username,
            full_name: account.full_name,
            email: account.email,
            phone_number: account.phone_number,
            account_type: account.account_type,
            is_first_login: account.is_first_login,
            status_id: account.status_id,
            role: profile.role,
            field_of_interest: profile.interests,
            allowed_notifications: account.allowed_notifications,
            created_at: account.created_at,
        }
    }
}

/// PATCH /api/v1/users body; every field is optional
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 100))]
    pub full_name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(custom = "validate_phone_number")]
    pub phone_number: Option<String>,
    #[validate(range(min = 1))]
    pub user_role: Option<i32>,
    #[validate(custom = "validate_positive_ids")]
    pub field_of_interest: Option<Vec<i32>>,
}

/// Partial update applied to an account; `None` leaves the column unchanged
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileUpdate {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub role_id: Option<i32>,
    /// Interests to link in addition to the existing ones
    pub interest_ids: Vec<i32>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.full_name.is_none()
            && self.email.is_none()
            && self.phone_number.is_none()
            && self.role_id.is_none()
            && self.interest_ids.is_empty()
    }
}

impl From<UpdateProfileRequest> for ProfileUpdate {
    fn from(request: UpdateProfileRequest) -> Self {
        Self {
            full_name: request.full_name,
            email: request.email,
            phone_number: request.phone_number,
            role_id: request.user_role,
            interest_ids: request.field_of_interest.unwrap_or_default(),
        }
    }
}

/// Notification database model
#[derive(Debug, Clone, FromRow)]
pub struct Notification {
    pub id: Uuid,
    pub account_id: Uuid,
    pub kind: String,
    pub title: String,
    pub body: String,
    pub event_id: Option<i32>,
    pub news_id: Option<i32>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// Notification response model
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NotificationResponse {
    pub id: Uuid,
    pub kind: String,
    pub title: String,
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_id: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub news_id: Option<i32>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Notification> for NotificationResponse {
    fn from(notification: Notification) -> Self {
        Self {
            id: notification.id,
            kind: notification.kind,
            title: notification.title,
            body: notification.body,
            event_id: notification.event_id,
            news_id: notification.news_id,
            is_read: notification.is_read,
            created_at: notification.created_at,
        }
    }
}

/// PATCH /api/v1/users/notifications body
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AllowedNotificationsRequest {
    pub allowed_notifications: Option<Vec<String>>,
}

/// POST /api/v1/users/send-contact-us body
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ContactUsRequest {
    #[validate(length(max = 5000), custom = "validate_not_blank")]
    pub content: String,
}
