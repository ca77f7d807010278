use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::ApiError;
use crate::users::models::{Notification, ProfileUpdate};

/// Persistence for profile fields, interests and notifications
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Id of the account that owns `email`, if any
    async fn find_account_id_by_email(&self, email: &str) -> Result<Option<Uuid>, ApiError>;

    /// Apply a partial update; interest links are added, never removed
    async fn update_profile(&self, account_id: Uuid, update: &ProfileUpdate) -> Result<(), ApiError>;

    /// Notifications for an account, newest first
    async fn list_notifications(&self, account_id: Uuid) -> Result<Vec<Notification>, ApiError>;

    async fn set_allowed_notifications(&self, account_id: Uuid, kinds: &[String]) -> Result<(), ApiError>;
}

/// PostgreSQL-backed profile store
#[derive(Clone)]
pub struct PgProfileStore {
    pool: PgPool,
}

impl PgProfileStore {
    /// Create a new PgProfileStore
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn map_write_error(e: sqlx::Error) -> ApiError {
        if let sqlx::Error::Database(db_err) = &e {
            if db_err.is_unique_violation() {
                return ApiError::Conflict {
                    message: "Email already in use by another user".to_string(),
                };
            }
            if db_err.is_foreign_key_violation() {
                return ApiError::BadRequest("Unknown role or field of interest".to_string());
            }
        }
        ApiError::DatabaseError(e)
    }
}

#[async_trait]
impl ProfileStore for PgProfileStore {
    async fn find_account_id_by_email(&self, email: &str) -> Result<Option<Uuid>, ApiError> {
        let id: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM accounts WHERE LOWER(email) = LOWER($1)")
                .bind(email)
                .fetch_optional(&self.pool)
                .await?;

        Ok(id)
    }

    async fn update_profile(&self, account_id: Uuid, update: &ProfileUpdate) -> Result<(), ApiError> {
        // Column update and interest links are applied atomically
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            UPDATE accounts
            SET full_name = COALESCE($1, full_name),
                email = COALESCE($2, email),
                phone_number = COALESCE($3, phone_number),
                role_id = COALESCE($4, role_id),
                updated_at = NOW()
            WHERE id = $5
            "#,
        )
        .bind(&update.full_name)
        .bind(&update.email)
        .bind(&update.phone_number)
        .bind(update.role_id)
        .bind(account_id)
        .execute(&mut *tx)
        .await
        .map_err(Self::map_write_error)?;

        for interest_id in &update.interest_ids {
            sqlx::query(
                r#"
                INSERT INTO account_interests (account_id, interest_id)
                VALUES ($1, $2)
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(account_id)
            .bind(interest_id)
            .execute(&mut *tx)
            .await
            .map_err(Self::map_write_error)?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn list_notifications(&self, account_id: Uuid) -> Result<Vec<Notification>, ApiError> {
        let notifications = sqlx::query_as::<_, Notification>(
            r#"
            SELECT id, account_id, kind, title, body, event_id, news_id, is_read, created_at
            FROM notifications
            WHERE account_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(account_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(notifications)
    }

    async fn set_allowed_notifications(&self, account_id: Uuid, kinds: &[String]) -> Result<(), ApiError> {
        sqlx::query(
            "UPDATE accounts SET allowed_notifications = $1, updated_at = NOW() WHERE id = $2",
        )
        .bind(kinds)
        .bind(account_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
