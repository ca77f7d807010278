// User directory: account and reset-token persistence

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::{
    error::AuthError,
    models::{Account, AccountDetail, AccountProfile, AccountType, Interest, NewAccount, ResetToken, Role},
};

/// Persistence collaborator for accounts and password-reset tokens
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Find an account whose username, own email, or linked staff/agent email equals `handle`
    async fn find_by_handle_or_linked_email(&self, handle: &str) -> Result<Option<Account>, AuthError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, AuthError>;

    /// Load an account with its role and interests
    async fn find_profile(&self, id: Uuid) -> Result<Option<AccountProfile>, AuthError>;

    /// Create an account and its type-specific detail row atomically
    async fn create_account(&self, new_account: NewAccount) -> Result<(Account, AccountDetail), AuthError>;

    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<(), AuthError>;

    /// Returns false when no account had this id
    async fn delete_account(&self, id: Uuid) -> Result<bool, AuthError>;

    /// Insert or overwrite the single reset token for (account, purpose)
    ///
    /// Expired tokens are purged first. A digest already held by another live token
    /// fails with `ResetSecretCollision` and nothing is written.
    async fn upsert_reset_token(
        &self,
        account_id: Uuid,
        purpose: &str,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AuthError>;

    /// The live (unexpired) token with this digest and purpose
    async fn find_reset_token(&self, token_hash: &str, purpose: &str) -> Result<Option<ResetToken>, AuthError>;

    /// Delete the live token and store the new password hash as one unit
    ///
    /// Returns false, changing nothing, when the token was already consumed or has expired.
    async fn consume_reset_token(
        &self,
        token_id: Uuid,
        account_id: Uuid,
        password_hash: &str,
    ) -> Result<bool, AuthError>;
}

const ACCOUNT_COLUMNS: &str = "a.id, a.username, a.password_hash, a.account_type, a.is_first_login, \
     a.status_id, a.full_name, a.email, a.phone_number, a.role_id, a.allowed_notifications, \
     a.created_at, a.updated_at";

/// PostgreSQL-backed user directory
#[derive(Clone)]
pub struct PgUserDirectory {
    pool: PgPool,
}

impl PgUserDirectory {
    /// Create a new PgUserDirectory
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn map_insert_error(e: sqlx::Error) -> AuthError {
        // Check for unique constraint violation
        if let sqlx::Error::Database(db_err) = &e {
            if db_err.is_unique_violation() {
                return AuthError::DuplicateAccount;
            }
        }
        AuthError::DatabaseError(e.to_string())
    }
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn find_by_handle_or_linked_email(&self, handle: &str) -> Result<Option<Account>, AuthError> {
        let account = sqlx::query_as::<_, Account>(&format!(
            r#"
            SELECT {ACCOUNT_COLUMNS}
            FROM accounts a
            WHERE a.username = $1
               OR LOWER(a.email) = LOWER($1)
               OR EXISTS (SELECT 1 FROM staff_details s WHERE s.account_id = a.id AND LOWER(s.email) = LOWER($1))
               OR EXISTS (SELECT 1 FROM agent_details d WHERE d.account_id = a.id AND LOWER(d.email) = LOWER($1))
            ORDER BY (a.username = $1) DESC
            LIMIT 1
            "#
        ))
        .bind(handle)
        .fetch_optional(&self.pool)
        .await?;

        Ok(account)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, AuthError> {
        let account = sqlx::query_as::<_, Account>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts a WHERE a.id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(account)
    }

    async fn find_profile(&self, id: Uuid) -> Result<Option<AccountProfile>, AuthError> {
        let Some(account) = self.find_by_id(id).await? else {
            return Ok(None);
        };

        let role = match account.role_id {
            Some(role_id) => {
                sqlx::query_as::<_, Role>("SELECT id, name FROM roles WHERE id = $1")
                    .bind(role_id)
                    .fetch_optional(&self.pool)
                    .await?
            }
            None => None,
        };

        let interests = sqlx::query_as::<_, Interest>(
            r#"
            SELECT f.id, f.name
            FROM fields_of_interest f
            JOIN account_interests ai ON ai.interest_id = f.id
            WHERE ai.account_id = $1
            ORDER BY f.id
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(AccountProfile {
            account,
            role,
            interests,
        }))
    }

    async fn create_account(&self, new_account: NewAccount) -> Result<(Account, AccountDetail), AuthError> {
        // Account and detail row commit together or not at all
        let mut tx = self.pool.begin().await?;

        let account = sqlx::query_as::<_, Account>(
            r#"
            INSERT INTO accounts (username, password_hash, account_type, is_first_login, status_id, email)
            VALUES ($1, $2, $3, TRUE, 1, $4)
            RETURNING id, username, password_hash, account_type, is_first_login, status_id,
                      full_name, email, phone_number, role_id, allowed_notifications,
                      created_at, updated_at
            "#,
        )
        .bind(&new_account.username)
        .bind(&new_account.password_hash)
        .bind(new_account.account_type.as_i16())
        .bind(&new_account.email)
        .fetch_one(&mut *tx)
        .await
        .map_err(Self::map_insert_error)?;

        let detail = match new_account.account_type {
            AccountType::Staff => {
                sqlx::query_as::<_, AccountDetail>(
                    r#"
                    INSERT INTO staff_details (account_id, email, first_name, last_name, branch_id)
                    VALUES ($1, $2, $3, $4, $5)
                    RETURNING id, account_id, email, first_name, last_name, branch_id,
                              NULL::TEXT AS phone_number
                    "#,
                )
                .bind(account.id)
                .bind(&new_account.email)
                .bind(&new_account.first_name)
                .bind(&new_account.last_name)
                .bind(new_account.branch_id)
                .fetch_one(&mut *tx)
                .await
                .map_err(Self::map_insert_error)?
            }
            AccountType::Agent => {
                sqlx::query_as::<_, AccountDetail>(
                    r#"
                    INSERT INTO agent_details (account_id, email, first_name, last_name, branch_id, phone_number)
                    VALUES ($1, $2, $3, $4, $5, $6)
                    RETURNING id, account_id, email, first_name, last_name, branch_id, phone_number
                    "#,
                )
                .bind(account.id)
                .bind(&new_account.email)
                .bind(&new_account.first_name)
                .bind(&new_account.last_name)
                .bind(new_account.branch_id)
                .bind(&new_account.phone_number)
                .fetch_one(&mut *tx)
                .await
                .map_err(Self::map_insert_error)?
            }
        };

        tx.commit().await?;

        Ok((account, detail))
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<(), AuthError> {
        sqlx::query(
            "UPDATE accounts SET password_hash = $1, updated_at = NOW() WHERE id = $2",
        )
        .bind(password_hash)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete_account(&self, id: Uuid) -> Result<bool, AuthError> {
        let result = sqlx::query("DELETE FROM accounts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn upsert_reset_token(
        &self,
        account_id: Uuid,
        purpose: &str,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AuthError> {
        let mut tx = self.pool.begin().await?;

        // Stale rows would otherwise keep their digests reserved forever
        sqlx::query("DELETE FROM verification_tokens WHERE expires_at <= NOW()")
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO verification_tokens (account_id, purpose, token_hash, expires_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (account_id, purpose)
            DO UPDATE SET token_hash = EXCLUDED.token_hash,
                          expires_at = EXCLUDED.expires_at,
                          created_at = NOW()
            "#,
        )
        .bind(account_id)
        .bind(purpose)
        .bind(token_hash)
        .bind(expires_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| match &e {
            // (account_id, purpose) is handled by ON CONFLICT, so this is the digest index
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                AuthError::ResetSecretCollision
            }
            _ => AuthError::DatabaseError(e.to_string()),
        })?;

        tx.commit().await?;
        Ok(())
    }

    async fn find_reset_token(&self, token_hash: &str, purpose: &str) -> Result<Option<ResetToken>, AuthError> {
        let token = sqlx::query_as::<_, ResetToken>(
            r#"
            SELECT id, account_id, purpose, token_hash, expires_at, created_at
            FROM verification_tokens
            WHERE token_hash = $1 AND purpose = $2 AND expires_at > NOW()
            "#,
        )
        .bind(token_hash)
        .bind(purpose)
        .fetch_optional(&self.pool)
        .await?;

        Ok(token)
    }

    async fn consume_reset_token(
        &self,
        token_id: Uuid,
        account_id: Uuid,
        password_hash: &str,
    ) -> Result<bool, AuthError> {
        let mut tx = self.pool.begin().await?;

        // Only the caller that removes the row may set the password
        let claimed = sqlx::query(
            "DELETE FROM verification_tokens WHERE id = $1 AND account_id = $2 AND expires_at > NOW()",
        )
        .bind(token_id)
        .bind(account_id)
        .execute(&mut *tx)
        .await?;
        if claimed.rows_affected() == 0 {
            return Ok(false);
        }

        sqlx::query("UPDATE accounts SET password_hash = $1, updated_at = NOW() WHERE id = $2")
            .bind(password_hash)
            .bind(account_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }
}
