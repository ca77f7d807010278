// Authentication gate for protected routes

use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use tracing::{debug, warn};

use crate::auth::{
    error::AuthError, models::AccountProfile, repository::UserDirectory, token::TokenService,
};
use crate::AppState;

/// Resolves the account behind a bearer session token
///
/// Every outcome is either a resolved profile or an `AuthError`; there is no
/// path that leaves the request unanswered.
pub struct AuthGate {
    token_service: Arc<TokenService>,
    directory: Arc<dyn UserDirectory>,
}

impl AuthGate {
    pub fn new(token_service: Arc<TokenService>, directory: Arc<dyn UserDirectory>) -> Self {
        Self {
            token_service,
            directory,
        }
    }

    /// Extract the token from `Authorization: Bearer <token>`
    ///
    /// Missing header, unreadable value, other schemes and an empty token all yield `None`.
    pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
        let token = headers
            .get(header::AUTHORIZATION)?
            .to_str()
            .ok()?
            .strip_prefix("Bearer ")?
            .trim();

        (!token.is_empty()).then_some(token)
    }

    /// Run the full check: token present, signature and expiry valid, account still exists
    pub async fn authenticate(&self, headers: &HeaderMap) -> Result<AccountProfile, AuthError> {
        let token = Self::bearer_token(headers).ok_or(AuthError::MissingToken)?;
        let account_id = self.token_service.verify_session_token(token)?;

        self.directory
            .find_profile(account_id)
            .await?
            .ok_or(AuthError::AccountGone)
    }
}

/// Identity attached to a request by [`require_auth`]
#[derive(Debug, Clone)]
pub struct CurrentAccount(pub AccountProfile);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentAccount
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Only present on routes behind the gate
        parts
            .extensions
            .get::<CurrentAccount>()
            .cloned()
            .ok_or(AuthError::MissingToken)
    }
}

/// Middleware that authenticates the request and attaches [`CurrentAccount`]
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let endpoint = request.uri().path().to_string();

    let profile = state
        .auth_gate
        .authenticate(request.headers())
        .await
        .map_err(|e| {
            warn!("Authentication failed for {}: {}", endpoint, e);
            e
        })?;

    debug!(
        "Authenticated account {} for {}",
        profile.account.id, endpoint
    );
    request.extensions_mut().insert(CurrentAccount(profile));

    Ok(next.run(request).await)
}
