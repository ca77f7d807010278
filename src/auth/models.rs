// Account data models and DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::auth::error::AuthError;
use crate::validation::validate_phone_number;

/// Purpose tag of the password-reset verification record
pub const RESET_PASSWORD_PURPOSE: &str = "RESET_PASSWORD";

/// Account discriminator: staff members (1) or external agents (2)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountType {
    Staff,
    Agent,
}

impl AccountType {
    pub fn as_i16(self) -> i16 {
        match self {
            AccountType::Staff => 1,
            AccountType::Agent => 2,
        }
    }
}

impl TryFrom<i32> for AccountType {
    type Error = AuthError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(AccountType::Staff),
            2 => Ok(AccountType::Agent),
            _ => Err(AuthError::InvalidAccountType),
        }
    }
}

/// Account database model
#[derive(Debug, Clone, FromRow)]
pub struct Account {
    pub id: Uuid,
    pub username: String,
    pub password_hash: String,
    pub account_type: i16,
    pub is_first_login: bool,
    pub status_id: i32,
    pub full_name: Option<String>,
    /// Contact address; reset secrets are delivered here
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub role_id: Option<i32>,
    pub allowed_notifications: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Role lookup row
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize, ToSchema)]
pub struct Role {
    pub id: i32,
    pub name: String,
}

/// Field of interest lookup row
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize, ToSchema)]
pub struct Interest {
    pub id: i32,
    pub name: String,
}

/// An account together with its role and interests, as resolved by the auth gate
#[derive(Debug, Clone)]
pub struct AccountProfile {
    pub account: Account,
    pub role: Option<Role>,
    pub interests: Vec<Interest>,
}

/// Type-specific detail row created alongside an account
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AccountDetail {
    pub id: i32,
    pub account_id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub branch_id: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
}

/// Everything the directory needs to create an account and its detail row
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub username: String,
    pub password_hash: String,
    pub account_type: AccountType,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub branch_id: i32,
    pub phone_number: Option<String>,
}

/// Password-reset verification record
#[derive(Debug, Clone, FromRow)]
pub struct ResetToken {
    pub id: Uuid,
    pub account_id: Uuid,
    pub purpose: String,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl ResetToken {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Account response model (excludes password_hash)
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AccountResponse {
    pub id: Uuid,
    pub username: String,
    pub account_type: i16,
    pub is_first_login: bool,
    pub status_id: i32,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Account> for AccountResponse {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            username: account.username,
            account_type: account.account_type,
            is_first_login: account.is_first_login,
            status_id: account.status_id,
            full_name: account.full_name,
            email: account.email,
            phone_number: account.phone_number,
            created_at: account.created_at,
        }
    }
}

/// Registration request DTO
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(length(min = 3, max = 50))]
    pub username: String,
    #[validate(email)]
    pub email: String,
    pub password: String,
    /// 1 = staff, 2 = agent
    pub user_type: i32,
    #[validate(length(min = 1, max = 100))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100))]
    pub last_name: String,
    pub branch_id: i32,
    #[validate(custom = "validate_phone_number")]
    pub phone_number: Option<String>,
}

/// Login request DTO; `email` may hold a username or a linked email
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[serde(alias = "username")]
    #[validate(length(min = 1))]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

/// Forgot-password request DTO
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ForgotPasswordRequest {
    #[serde(alias = "username")]
    #[validate(length(min = 1))]
    pub email: String,
}

/// Reset-password request DTO
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ResetPasswordRequest {
    #[validate(length(min = 1))]
    pub token: String,
    pub password: String,
}

/// Change-password request DTO
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1))]
    pub current_password: String,
    pub new_password: String,
}

/// Login outcome
#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub token: String,
    pub user: AccountResponse,
}

/// Registration outcome
#[derive(Debug, Serialize, ToSchema)]
pub struct RegisterResponse {
    pub token: String,
    pub user: AccountResponse,
    pub details: AccountDetail,
}
