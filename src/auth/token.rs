// Session token and password-reset secret service

use crate::auth::error::AuthError;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation,
};
use rand::{rngs::OsRng, Rng};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Default session validity: one year
pub const DEFAULT_SESSION_TTL_DAYS: i64 = 365;

/// Default reset secret validity: ten minutes
pub const DEFAULT_RESET_TTL_MINUTES: i64 = 10;

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,  // account id
    pub exp: i64,   // expiration timestamp
    pub iat: i64,   // issued at timestamp
}

/// Freshly minted password-reset secret
///
/// Only `digest` is persisted; `plaintext` is handed to the mailer.
#[derive(Debug, Clone)]
pub struct ResetSecret {
    pub plaintext: String,
    pub digest: String,
    pub expires_at: DateTime<Utc>,
}

/// Token service for session JWTs and reset secrets
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    session_ttl: Duration,
    reset_ttl: Duration,
}

impl TokenService {
    /// Create a new TokenService with secret key and the default lifetimes
    pub fn new(secret: &str) -> Self {
        Self::with_lifetimes(
            secret,
            Duration::days(DEFAULT_SESSION_TTL_DAYS),
            Duration::minutes(DEFAULT_RESET_TTL_MINUTES),
        )
    }

    pub fn with_lifetimes(secret: &str, session_ttl: Duration, reset_ttl: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            session_ttl,
            reset_ttl,
        }
    }

    pub fn reset_ttl(&self) -> Duration {
        self.reset_ttl
    }

    /// Issue a signed session token for an account
    pub fn issue_session_token(&self, account_id: Uuid) -> Result<String, AuthError> {
        let now = Utc::now().timestamp();

        let claims = Claims {
            sub: account_id,
            iat: now,
            exp: now + self.session_ttl.num_seconds(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AuthError::TokenGenerationError(e.to_string()))
    }

    /// Verify a session token and return the account id it was issued for
    pub fn verify_session_token(&self, token: &str) -> Result<Uuid, AuthError> {
        self.decode_claims(token).map(|claims| claims.sub)
    }

    fn decode_claims(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::TokenMalformed,
            })
    }

    /// Mint a 5-digit reset secret with its lookup digest and expiry
    pub fn issue_reset_secret(&self) -> ResetSecret {
        let plaintext = OsRng.gen_range(10_000..100_000).to_string();
        let digest = Self::digest_reset_secret(&plaintext);

        ResetSecret {
            plaintext,
            digest,
            expires_at: Utc::now() + self.reset_ttl,
        }
    }

    /// SHA-256 hex digest of a reset secret, used as the stored lookup key
    pub fn digest_reset_secret(plaintext: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(plaintext.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}
