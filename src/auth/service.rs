// Account lifecycle service - business logic layer

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::auth::{
    error::AuthError,
    models::{
        AccountType, AuthResponse, NewAccount, RegisterRequest, RegisterResponse,
        RESET_PASSWORD_PURPOSE,
    },
    password::PasswordService,
    repository::UserDirectory,
    token::TokenService,
};
use crate::mail::{Mailer, OutgoingEmail};

/// Fresh secrets minted before a reset request gives up on digest collisions
const MAX_RESET_SECRET_ATTEMPTS: usize = 5;

/// Account lifecycle service coordinating login, registration and password flows
pub struct AccountService {
    directory: Arc<dyn UserDirectory>,
    password_service: PasswordService,
    token_service: Arc<TokenService>,
    mailer: Arc<dyn Mailer>,
    org_inbox: String,
}

impl AccountService {
    /// Create a new AccountService
    pub fn new(
        directory: Arc<dyn UserDirectory>,
        password_service: PasswordService,
        token_service: Arc<TokenService>,
        mailer: Arc<dyn Mailer>,
        org_inbox: String,
    ) -> Self {
        Self {
            directory,
            password_service,
            token_service,
            mailer,
            org_inbox,
        }
    }

    /// Login with a username or linked email
    ///
    /// Unknown handle and wrong password fail identically.
    pub async fn login(&self, handle: &str, password: &str) -> Result<AuthResponse, AuthError> {
        let Some(account) = self.directory.find_by_handle_or_linked_email(handle).await? else {
            debug!("Login attempt for unknown handle");
            return Err(AuthError::InvalidCredentials);
        };

        if !self
            .password_service
            .verify_password(password, &account.password_hash)
            .await?
        {
            debug!("Login attempt with wrong password for account {}", account.id);
            return Err(AuthError::InvalidCredentials);
        }

        let token = self.token_service.issue_session_token(account.id)?;

        info!("Account {} logged in", account.id);
        Ok(AuthResponse {
            token,
            user: account.into(),
        })
    }

    /// Register a new account with its staff or agent detail
    pub async fn register(&self, request: RegisterRequest) -> Result<RegisterResponse, AuthError> {
        // 1. Resolve the discriminator before anything is written
        let account_type = AccountType::try_from(request.user_type)?;

        // 2. Enforce password policy
        PasswordService::validate_password_strength(&request.password)?;

        // 3. Check for an existing account with this handle
        if self
            .directory
            .find_by_handle_or_linked_email(&request.username)
            .await?
            .is_some()
        {
            warn!("Registration attempt for existing handle {}", request.username);
            return Err(AuthError::DuplicateAccount);
        }

        // 4. Hash and create account + detail as one unit
        let password_hash = self.password_service.hash_password(&request.password).await?;
        let (account, detail) = self
            .directory
            .create_account(NewAccount {
                username: request.username,
                password_hash,
                account_type,
                email: request.email,
                first_name: request.first_name,
                last_name: request.last_name,
                branch_id: request.branch_id,
                phone_number: request.phone_number,
            })
            .await?;

        // 5. Issue a session token
        let token = self.token_service.issue_session_token(account.id)?;

        info!("Registered account {} ({:?})", account.id, account_type);
        Ok(RegisterResponse {
            token,
            user: account.into(),
            details: detail,
        })
    }

    /// Mint a reset secret, store its digest and mail the plaintext to the account owner
    pub async fn request_password_reset(&self, handle: &str) -> Result<(), AuthError> {
        let account = self
            .directory
            .find_by_handle_or_linked_email(handle)
            .await?
            .ok_or(AuthError::AccountNotFound)?;

        let recipient = account.email.clone().ok_or_else(|| {
            AuthError::ValidationError("No email address is on file for this account".to_string())
        })?;

        // A digest held by another live token is never shared; mint again
        let mut attempt = 1;
        let secret = loop {
            let secret = self.token_service.issue_reset_secret();
            match self
                .directory
                .upsert_reset_token(
                    account.id,
                    RESET_PASSWORD_PURPOSE,
                    &secret.digest,
                    secret.expires_at,
                )
                .await
            {
                Ok(()) => break secret,
                Err(AuthError::ResetSecretCollision) if attempt < MAX_RESET_SECRET_ATTEMPTS => {
                    debug!("Reset secret collision for account {}, attempt {}", account.id, attempt);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        };

        let email = OutgoingEmail::password_reset(
            &self.org_inbox,
            &recipient,
            &secret.plaintext,
            self.token_service.reset_ttl().num_minutes(),
        );
        self.mailer
            .send(email)
            .await
            .map_err(AuthError::ResetDeliveryFailed)?;

        info!("Password reset secret issued for account {}", account.id);
        Ok(())
    }

    /// Consume a reset secret and set a new password
    pub async fn complete_password_reset(
        &self,
        secret: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        PasswordService::validate_password_strength(new_password)?;

        let digest = TokenService::digest_reset_secret(secret);
        let token = self
            .directory
            .find_reset_token(&digest, RESET_PASSWORD_PURPOSE)
            .await?
            .filter(|token| !token.is_expired(Utc::now()))
            .ok_or(AuthError::ResetTokenInvalidOrExpired)?;

        let password_hash = self.password_service.hash_password(new_password).await?;

        // Claim and password write commit together; a concurrent completion loses here
        if !self
            .directory
            .consume_reset_token(token.id, token.account_id, &password_hash)
            .await?
        {
            return Err(AuthError::ResetTokenInvalidOrExpired);
        }

        info!("Password reset completed for account {}", token.account_id);
        Ok(())
    }

    /// Change the password of an authenticated account
    pub async fn change_password(
        &self,
        account_id: Uuid,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        let account = self
            .directory
            .find_by_id(account_id)
            .await?
            .ok_or(AuthError::AccountGone)?;

        if !self
            .password_service
            .verify_password(current_password, &account.password_hash)
            .await?
        {
            return Err(AuthError::InvalidCredentials);
        }

        PasswordService::validate_password_strength(new_password)?;
        let password_hash = self.password_service.hash_password(new_password).await?;
        self.directory.update_password(account_id, &password_hash).await?;

        info!("Password changed for account {}", account_id);
        Ok(())
    }
}
