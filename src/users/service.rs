// Profile, notification and contact-us service

use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::auth::{error::AuthError, models::AccountProfile, repository::UserDirectory};
use crate::error::ApiError;
use crate::mail::{Mailer, OutgoingEmail};
use crate::users::{
    models::{ContactUsRequest, NotificationResponse, ProfileUpdate, UpdateProfileRequest},
    repository::ProfileStore,
};

/// Service layer for the authenticated account's own data
pub struct ProfileService {
    directory: Arc<dyn UserDirectory>,
    store: Arc<dyn ProfileStore>,
    mailer: Arc<dyn Mailer>,
    org_inbox: String,
}

impl ProfileService {
    /// Create a new ProfileService
    pub fn new(
        directory: Arc<dyn UserDirectory>,
        store: Arc<dyn ProfileStore>,
        mailer: Arc<dyn Mailer>,
        org_inbox: String,
    ) -> Self {
        Self {
            directory,
            store,
            mailer,
            org_inbox,
        }
    }

    /// Apply a partial profile update and return the refreshed profile
    ///
    /// This method:
    /// 1. Validates the request
    /// 2. Rejects an email owned by a different account
    /// 3. Writes the non-empty part of the update
    /// 4. Reloads the profile with role and interests
    pub async fn update_profile(
        &self,
        account_id: Uuid,
        request: UpdateProfileRequest,
    ) -> Result<AccountProfile, ApiError> {
        // 1. Validate request
        request.validate()?;
        let update = ProfileUpdate::from(request);

        // 2. Email uniqueness across accounts
        if let Some(email) = &update.email {
            if let Some(owner) = self.store.find_account_id_by_email(email).await? {
                if owner != account_id {
                    warn!("Account {} tried to take email owned by {}", account_id, owner);
                    return Err(ApiError::Conflict {
                        message: "Email already in use by another user".to_string(),
                    });
                }
            }
        }

        // 3. Write
        if update.is_empty() {
            debug!("Empty profile update for account {}", account_id);
        } else {
            self.store.update_profile(account_id, &update).await?;
            info!("Updated profile of account {}", account_id);
        }

        // 4. Reload
        let profile = self
            .directory
            .find_profile(account_id)
            .await?
            .ok_or(AuthError::AccountGone)?;

        Ok(profile)
    }

    pub async fn delete_account(&self, account_id: Uuid) -> Result<(), ApiError> {
        if !self.directory.delete_account(account_id).await? {
            return Err(AuthError::AccountGone.into());
        }

        info!("Deleted account {}", account_id);
        Ok(())
    }

    /// Notifications of the account, newest first
    pub async fn notifications(&self, account_id: Uuid) -> Result<Vec<NotificationResponse>, ApiError> {
        let notifications = self.store.list_notifications(account_id).await?;
        Ok(notifications.into_iter().map(Into::into).collect())
    }

    /// Replace the notification kinds the account wants to receive
    pub async fn set_allowed_notifications(
        &self,
        account_id: Uuid,
        kinds: Option<Vec<String>>,
    ) -> Result<(), ApiError> {
        let kinds = kinds.ok_or_else(|| ApiError::BadRequest("Invalid input".to_string()))?;

        self.store.set_allowed_notifications(account_id, &kinds).await?;
        debug!("Account {} now allows {:?}", account_id, kinds);
        Ok(())
    }

    /// Relay a contact-us message from the account to the organisation inbox
    pub async fn send_contact_us(
        &self,
        profile: &AccountProfile,
        request: ContactUsRequest,
    ) -> Result<(), ApiError> {
        request.validate()?;

        let account = &profile.account;
        let sender = account.email.as_deref().ok_or_else(|| {
            ApiError::BadRequest("No email address is on file for this account".to_string())
        })?;
        let full_name = account.full_name.as_deref().unwrap_or(&account.username);

        let email = OutgoingEmail::contact_us(&self.org_inbox, full_name, sender, &request.content);
        self.mailer.send(email).await?;

        info!("Relayed contact-us message from account {}", account.id);
        Ok(())
    }
}
