// In-memory collaborators shared by unit and HTTP tests

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::auth::{
    error::AuthError,
    models::{
        Account, AccountDetail, AccountProfile, AccountType, Interest, NewAccount,
        RegisterRequest, ResetToken, Role, RESET_PASSWORD_PURPOSE,
    },
    password::PasswordService,
    repository::UserDirectory,
    service::AccountService,
    token::TokenService,
};
use crate::error::ApiError;
use crate::mail::{MailError, Mailer, OutgoingEmail};
use crate::users::{
    models::{Notification, ProfileUpdate},
    repository::ProfileStore,
    service::ProfileService,
};
use crate::AppState;

pub const TEST_SECRET: &str = "test_secret";
pub const TEST_PASSWORD: &str = "Secr3t!";
pub const ORG_INBOX: &str = "news@org.test";

#[derive(Default)]
struct DirectoryState {
    accounts: Vec<Account>,
    details: Vec<AccountDetail>,
    reset_tokens: Vec<ResetToken>,
    roles: Vec<Role>,
    interests: Vec<Interest>,
    account_interests: Vec<(Uuid, i32)>,
    notifications: Vec<Notification>,
    next_detail_id: i32,
    fail_next_detail_insert: bool,
    fail_next_password_write: bool,
    forced_reset_collisions: usize,
    unavailable: bool,
}

impl DirectoryState {
    fn check_available(&self) -> Result<(), AuthError> {
        if self.unavailable {
            Err(AuthError::DatabaseError("store unavailable".to_string()))
        } else {
            Ok(())
        }
    }

    fn email_taken(&self, email: &str) -> bool {
        self.accounts
            .iter()
            .filter_map(|a| a.email.as_deref())
            .chain(self.details.iter().map(|d| d.email.as_str()))
            .any(|e| e.eq_ignore_ascii_case(email))
    }
}

/// In-memory `UserDirectory` + `ProfileStore` with the same observable rules as the
/// PostgreSQL implementations (uniqueness, atomic registration, cascading delete)
#[derive(Default)]
pub struct InMemoryDirectory {
    state: Mutex<DirectoryState>,
}

impl InMemoryDirectory {
    pub fn account_count(&self) -> usize {
        self.state.lock().unwrap().accounts.len()
    }

    pub fn reset_token_count(&self) -> usize {
        self.state.lock().unwrap().reset_tokens.len()
    }

    /// Move every stored reset token into the past
    pub fn expire_reset_tokens(&self) {
        let past = Utc::now() - Duration::minutes(1);
        for token in self.state.lock().unwrap().reset_tokens.iter_mut() {
            token.expires_at = past;
        }
    }

    /// Make the next detail-row insert fail, after the account row was staged
    pub fn fail_next_detail_insert(&self) {
        self.state.lock().unwrap().fail_next_detail_insert = true;
    }

    /// Make the next password write fail; a reset claim in the same unit is rolled back
    pub fn fail_next_password_write(&self) {
        self.state.lock().unwrap().fail_next_password_write = true;
    }

    /// Report a digest collision for the next `count` reset-token upserts
    pub fn force_reset_collisions(&self, count: usize) {
        self.state.lock().unwrap().forced_reset_collisions = count;
    }

    /// Store a reset token for `plaintext` as-is, bypassing purge and uniqueness
    pub fn seed_reset_token(&self, account_id: Uuid, plaintext: &str, expires_at: DateTime<Utc>) {
        self.state.lock().unwrap().reset_tokens.push(ResetToken {
            id: Uuid::new_v4(),
            account_id,
            purpose: RESET_PASSWORD_PURPOSE.to_string(),
            token_hash: TokenService::digest_reset_secret(plaintext),
            expires_at,
            created_at: Utc::now(),
        });
    }

    /// Simulate an unreachable store; every call fails with a database error
    pub fn set_unavailable(&self, unavailable: bool) {
        self.state.lock().unwrap().unavailable = unavailable;
    }

    pub fn seed_interests(&self, interests: &[(i32, &str)]) {
        let mut state = self.state.lock().unwrap();
        for (id, name) in interests {
            state.interests.push(Interest {
                id: *id,
                name: name.to_string(),
            });
        }
    }

    pub fn seed_role(&self, id: i32, name: &str) {
        self.state.lock().unwrap().roles.push(Role {
            id,
            name: name.to_string(),
        });
    }

    /// Add a notification created `minutes_ago` minutes before now
    pub fn push_notification(&self, account_id: Uuid, kind: &str, title: &str, minutes_ago: i64) {
        self.state.lock().unwrap().notifications.push(Notification {
            id: Uuid::new_v4(),
            account_id,
            kind: kind.to_string(),
            title: title.to_string(),
            body: format!("{} body", title),
            event_id: None,
            news_id: Some(1),
            is_read: false,
            created_at: Utc::now() - Duration::minutes(minutes_ago),
        });
    }

    fn insert_account(&self, account: Account) {
        self.state.lock().unwrap().accounts.push(account);
    }
}

#[async_trait]
impl UserDirectory for InMemoryDirectory {
    async fn find_by_handle_or_linked_email(&self, handle: &str) -> Result<Option<Account>, AuthError> {
        let state = self.state.lock().unwrap();
        state.check_available()?;

        if let Some(account) = state.accounts.iter().find(|a| a.username == handle) {
            return Ok(Some(account.clone()));
        }

        let linked = state.accounts.iter().find(|a| {
            a.email
                .as_deref()
                .is_some_and(|e| e.eq_ignore_ascii_case(handle))
                || state
                    .details
                    .iter()
                    .any(|d| d.account_id == a.id && d.email.eq_ignore_ascii_case(handle))
        });

        Ok(linked.cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, AuthError> {
        let state = self.state.lock().unwrap();
        state.check_available()?;
        Ok(state.accounts.iter().find(|a| a.id == id).cloned())
    }

    async fn find_profile(&self, id: Uuid) -> Result<Option<AccountProfile>, AuthError> {
        let state = self.state.lock().unwrap();
        state.check_available()?;

        let Some(account) = state.accounts.iter().find(|a| a.id == id).cloned() else {
            return Ok(None);
        };
        let role = account
            .role_id
            .and_then(|role_id| state.roles.iter().find(|r| r.id == role_id).cloned());
        let mut interests: Vec<Interest> = state
            .interests
            .iter()
            .filter(|i| state.account_interests.contains(&(id, i.id)))
            .cloned()
            .collect();
        interests.sort_by_key(|i| i.id);

        Ok(Some(AccountProfile {
            account,
            role,
            interests,
        }))
    }

    async fn create_account(&self, new_account: NewAccount) -> Result<(Account, AccountDetail), AuthError> {
        let mut state = self.state.lock().unwrap();
        state.check_available()?;

        if state.accounts.iter().any(|a| a.username == new_account.username)
            || state.email_taken(&new_account.email)
        {
            return Err(AuthError::DuplicateAccount);
        }

        // Whole unit rolls back: nothing is kept when the detail row fails
        if state.fail_next_detail_insert {
            state.fail_next_detail_insert = false;
            return Err(AuthError::DatabaseError("detail insert failed".to_string()));
        }

        let now = Utc::now();
        let account = Account {
            id: Uuid::new_v4(),
            username: new_account.username,
            password_hash: new_account.password_hash,
            account_type: new_account.account_type.as_i16(),
            is_first_login: true,
            status_id: 1,
            full_name: None,
            email: Some(new_account.email.clone()),
            phone_number: None,
            role_id: None,
            allowed_notifications: Vec::new(),
            created_at: now,
            updated_at: now,
        };

        state.next_detail_id += 1;
        let detail = AccountDetail {
            id: state.next_detail_id,
            account_id: account.id,
            email: new_account.email,
            first_name: new_account.first_name,
            last_name: new_account.last_name,
            branch_id: new_account.branch_id,
            phone_number: match new_account.account_type {
                AccountType::Staff => None,
                AccountType::Agent => new_account.phone_number,
            },
        };

        state.accounts.push(account.clone());
        state.details.push(detail.clone());
        Ok((account, detail))
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<(), AuthError> {
        let mut state = self.state.lock().unwrap();
        state.check_available()?;
        if state.fail_next_password_write {
            state.fail_next_password_write = false;
            return Err(AuthError::DatabaseError("password write failed".to_string()));
        }

        if let Some(account) = state.accounts.iter_mut().find(|a| a.id == id) {
            account.password_hash = password_hash.to_string();
            account.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn delete_account(&self, id: Uuid) -> Result<bool, AuthError> {
        let mut state = self.state.lock().unwrap();
        state.check_available()?;

        let before = state.accounts.len();
        state.accounts.retain(|a| a.id != id);
        if state.accounts.len() == before {
            return Ok(false);
        }

        // Cascade
        state.details.retain(|d| d.account_id != id);
        state.reset_tokens.retain(|t| t.account_id != id);
        state.account_interests.retain(|(account_id, _)| *account_id != id);
        state.notifications.retain(|n| n.account_id != id);
        Ok(true)
    }

    async fn upsert_reset_token(
        &self,
        account_id: Uuid,
        purpose: &str,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AuthError> {
        let mut state = self.state.lock().unwrap();
        state.check_available()?;

        let now = Utc::now();
        state.reset_tokens.retain(|t| !t.is_expired(now));

        if state.forced_reset_collisions > 0 {
            state.forced_reset_collisions -= 1;
            return Err(AuthError::ResetSecretCollision);
        }
        let held_elsewhere = state.reset_tokens.iter().any(|t| {
            t.token_hash == token_hash && !(t.account_id == account_id && t.purpose == purpose)
        });
        if held_elsewhere {
            return Err(AuthError::ResetSecretCollision);
        }

        let existing = state
            .reset_tokens
            .iter_mut()
            .find(|t| t.account_id == account_id && t.purpose == purpose);
        match existing {
            Some(token) => {
                token.token_hash = token_hash.to_string();
                token.expires_at = expires_at;
                token.created_at = now;
            }
            None => state.reset_tokens.push(ResetToken {
                id: Uuid::new_v4(),
                account_id,
                purpose: purpose.to_string(),
                token_hash: token_hash.to_string(),
                expires_at,
                created_at: now,
            }),
        }
        Ok(())
    }

    async fn find_reset_token(&self, token_hash: &str, purpose: &str) -> Result<Option<ResetToken>, AuthError> {
        let state = self.state.lock().unwrap();
        state.check_available()?;

        let now = Utc::now();
        Ok(state
            .reset_tokens
            .iter()
            .find(|t| t.token_hash == token_hash && t.purpose == purpose && !t.is_expired(now))
            .cloned())
    }

    async fn consume_reset_token(
        &self,
        token_id: Uuid,
        account_id: Uuid,
        password_hash: &str,
    ) -> Result<bool, AuthError> {
        let mut state = self.state.lock().unwrap();
        state.check_available()?;

        let now = Utc::now();
        let live = state
            .reset_tokens
            .iter()
            .any(|t| t.id == token_id && t.account_id == account_id && !t.is_expired(now));
        if !live {
            return Ok(false);
        }

        // Rolled back as a unit: the token survives a failed password write
        if state.fail_next_password_write {
            state.fail_next_password_write = false;
            return Err(AuthError::DatabaseError("password write failed".to_string()));
        }

        state.reset_tokens.retain(|t| t.id != token_id);
        if let Some(account) = state.accounts.iter_mut().find(|a| a.id == account_id) {
            account.password_hash = password_hash.to_string();
            account.updated_at = now;
        }
        Ok(true)
    }
}

#[async_trait]
impl ProfileStore for InMemoryDirectory {
    async fn find_account_id_by_email(&self, email: &str) -> Result<Option<Uuid>, ApiError> {
        let state = self.state.lock().unwrap();
        state.check_available()?;
        Ok(state
            .accounts
            .iter()
            .find(|a| a.email.as_deref().is_some_and(|e| e.eq_ignore_ascii_case(email)))
            .map(|a| a.id))
    }

    async fn update_profile(&self, account_id: Uuid, update: &ProfileUpdate) -> Result<(), ApiError> {
        let mut state = self.state.lock().unwrap();
        state.check_available()?;

        // Constraint checks first so a rejected update changes nothing
        if let Some(email) = &update.email {
            let taken = state.accounts.iter().any(|a| {
                a.id != account_id
                    && a.email.as_deref().is_some_and(|e| e.eq_ignore_ascii_case(email))
            });
            if taken {
                return Err(ApiError::Conflict {
                    message: "Email already in use by another user".to_string(),
                });
            }
        }
        let unknown_role = update
            .role_id
            .is_some_and(|role_id| !state.roles.iter().any(|r| r.id == role_id));
        let unknown_interest = update
            .interest_ids
            .iter()
            .any(|id| !state.interests.iter().any(|i| i.id == *id));
        if unknown_role || unknown_interest {
            return Err(ApiError::BadRequest(
                "Unknown role or field of interest".to_string(),
            ));
        }

        let Some(account) = state.accounts.iter_mut().find(|a| a.id == account_id) else {
            return Ok(());
        };
        if let Some(full_name) = &update.full_name {
            account.full_name = Some(full_name.clone());
        }
        if let Some(email) = &update.email {
            account.email = Some(email.clone());
        }
        if let Some(phone_number) = &update.phone_number {
            account.phone_number = Some(phone_number.clone());
        }
        if let Some(role_id) = update.role_id {
            account.role_id = Some(role_id);
        }
        account.updated_at = Utc::now();

        for interest_id in &update.interest_ids {
            if !state.account_interests.contains(&(account_id, *interest_id)) {
                state.account_interests.push((account_id, *interest_id));
            }
        }
        Ok(())
    }

    async fn list_notifications(&self, account_id: Uuid) -> Result<Vec<Notification>, ApiError> {
        let state = self.state.lock().unwrap();
        state.check_available()?;

        let mut notifications: Vec<Notification> = state
            .notifications
            .iter()
            .filter(|n| n.account_id == account_id)
            .cloned()
            .collect();
        notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(notifications)
    }

    async fn set_allowed_notifications(&self, account_id: Uuid, kinds: &[String]) -> Result<(), ApiError> {
        let mut state = self.state.lock().unwrap();
        state.check_available()?;

        if let Some(account) = state.accounts.iter_mut().find(|a| a.id == account_id) {
            account.allowed_notifications = kinds.to_vec();
            account.updated_at = Utc::now();
        }
        Ok(())
    }
}

/// Mailer that records every message instead of sending it
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<OutgoingEmail>>,
    fail: bool,
}

impl RecordingMailer {
    /// A mailer whose transport always refuses
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<(), MailError> {
        if self.fail {
            return Err(MailError::Transport("connection refused".to_string()));
        }
        self.sent.lock().unwrap().push(email);
        Ok(())
    }
}

/// Insert a staff account whose password is [`TEST_PASSWORD`]
pub fn seed_account(directory: &Arc<InMemoryDirectory>, username: &str, email: &str) -> Uuid {
    let now = Utc::now();
    let account = Account {
        id: Uuid::new_v4(),
        username: username.to_string(),
        password_hash: bcrypt::hash(TEST_PASSWORD, 4).unwrap(),
        account_type: AccountType::Staff.as_i16(),
        is_first_login: true,
        status_id: 1,
        full_name: None,
        email: Some(email.to_string()),
        phone_number: None,
        role_id: None,
        allowed_notifications: Vec::new(),
        created_at: now,
        updated_at: now,
    };
    let id = account.id;
    directory.insert_account(account);
    id
}

/// Registration body for a staff (1) or agent (2) account with password [`TEST_PASSWORD`]
pub fn register_request(username: &str, email: &str, user_type: i32) -> RegisterRequest {
    RegisterRequest {
        username: username.to_string(),
        email: email.to_string(),
        password: TEST_PASSWORD.to_string(),
        user_type,
        first_name: "Test".to_string(),
        last_name: "User".to_string(),
        branch_id: 1,
        phone_number: (user_type == 2).then(|| "0591234567".to_string()),
    }
}

pub fn test_account_service() -> (AccountService, Arc<InMemoryDirectory>, Arc<RecordingMailer>) {
    let directory = Arc::new(InMemoryDirectory::default());
    let mailer = Arc::new(RecordingMailer::default());
    let service = AccountService::new(
        directory.clone(),
        PasswordService::new(4),
        Arc::new(TokenService::new(TEST_SECRET)),
        mailer.clone(),
        ORG_INBOX.to_string(),
    );
    (service, directory, mailer)
}

pub fn test_profile_service() -> (ProfileService, Arc<InMemoryDirectory>, Arc<RecordingMailer>) {
    let directory = Arc::new(InMemoryDirectory::default());
    let mailer = Arc::new(RecordingMailer::default());
    let service = ProfileService::new(
        directory.clone(),
        directory.clone(),
        mailer.clone(),
        ORG_INBOX.to_string(),
    );
    (service, directory, mailer)
}

pub fn test_state() -> (AppState, Arc<InMemoryDirectory>, Arc<RecordingMailer>) {
    let directory = Arc::new(InMemoryDirectory::default());
    let mailer = Arc::new(RecordingMailer::default());
    let state = AppState::new(
        directory.clone(),
        directory.clone(),
        mailer.clone(),
        PasswordService::new(4),
        TokenService::new(TEST_SECRET),
        ORG_INBOX.to_string(),
    );
    (state, directory, mailer)
}
