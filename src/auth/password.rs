// Password hashing and validation service

use crate::auth::error::AuthError;

/// Default bcrypt work factor
pub const DEFAULT_BCRYPT_COST: u32 = 12;

/// Minimum password length
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Maximum password length (bcrypt only reads the first 72 bytes)
pub const MAX_PASSWORD_LENGTH: usize = 72;

/// Password service for hashing and verification
///
/// Hashing and verification are CPU-heavy and run on the blocking thread pool.
#[derive(Debug, Clone)]
pub struct PasswordService {
    cost: u32,
}

impl Default for PasswordService {
    fn default() -> Self {
        Self::new(DEFAULT_BCRYPT_COST)
    }
}

impl PasswordService {
    /// Create a PasswordService with the given bcrypt cost
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    /// Hash a password using bcrypt; the salt is embedded in the returned digest
    pub async fn hash_password(&self, password: &str) -> Result<String, AuthError> {
        let password = password.to_string();
        let cost = self.cost;

        tokio::task::spawn_blocking(move || {
            bcrypt::hash(password, cost).map_err(|e| AuthError::PasswordHashError(e.to_string()))
        })
        .await
        .map_err(|e| AuthError::PasswordHashError(format!("Task join error: {}", e)))?
    }

    /// Verify a password against a hash
    ///
    /// A mismatch is `Ok(false)`; only an unparseable digest is an error.
    pub async fn verify_password(&self, password: &str, hash: &str) -> Result<bool, AuthError> {
        let password = password.to_string();
        let hash = hash.to_string();

        tokio::task::spawn_blocking(move || {
            bcrypt::verify(password, &hash).map_err(|e| {
                tracing::error!("Stored password hash could not be parsed: {}", e);
                AuthError::HashFormat
            })
        })
        .await
        .map_err(|e| AuthError::PasswordHashError(format!("Task join error: {}", e)))?
    }

    /// Validate password length requirements
    pub fn validate_password_strength(password: &str) -> Result<(), AuthError> {
        if password.len() < MIN_PASSWORD_LENGTH {
            return Err(AuthError::ValidationError(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LENGTH
            )));
        }

        if password.len() > MAX_PASSWORD_LENGTH {
            return Err(AuthError::ValidationError(format!(
                "Password must be at most {} characters",
                MAX_PASSWORD_LENGTH
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    // Lowest cost bcrypt accepts, keeps the suite fast
    fn test_password_service() -> PasswordService {
        PasswordService::new(4)
    }

    #[tokio::test]
    async fn test_hash_then_verify() {
        let service = test_password_service();
        let hash = service.hash_password("Secr3t!").await.unwrap();

        assert!(service.verify_password("Secr3t!", &hash).await.unwrap());
        assert!(!service.verify_password("secr3t!", &hash).await.unwrap());
    }

    #[tokio::test]
    async fn test_same_password_gets_fresh_salt() {
        let service = test_password_service();
        let first = service.hash_password("correct horse").await.unwrap();
        let second = service.hash_password("correct horse").await.unwrap();

        assert_ne!(first, second);
        assert!(service.verify_password("correct horse", &first).await.unwrap());
        assert!(service.verify_password("correct horse", &second).await.unwrap());
    }

    #[tokio::test]
    async fn test_default_cost_is_twelve() {
        let service = PasswordService::default();
        assert_eq!(service.cost(), 12);
    }

    #[tokio::test]
    async fn test_digest_records_cost() {
        let service = test_password_service();
        let hash = service.hash_password("abcdef").await.unwrap();
        assert!(hash.starts_with("$2b$04$"), "unexpected digest prefix: {}", hash);
    }

    #[tokio::test]
    async fn test_malformed_digest_is_format_error() {
        let service = test_password_service();
        let result = service.verify_password("whatever", "not-a-bcrypt-hash").await;
        assert!(matches!(result, Err(AuthError::HashFormat)));
    }

    #[test]
    fn test_password_length_rules() {
        assert!(PasswordService::validate_password_strength("Secr3t!").is_ok());
        assert!(PasswordService::validate_password_strength("short").is_err());
        assert!(PasswordService::validate_password_strength(&"x".repeat(73)).is_err());
        assert!(PasswordService::validate_password_strength(&"x".repeat(72)).is_ok());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(12))]

        #[test]
        fn prop_hash_verifies_only_its_own_password(
            password in "[a-zA-Z0-9!@#]{6,30}",
            other in "[a-zA-Z0-9!@#]{6,30}"
        ) {
            prop_assume!(password != other);

            let service = test_password_service();
            let rt = tokio::runtime::Runtime::new().unwrap();
            let hash = rt.block_on(service.hash_password(&password)).unwrap();

            prop_assert!(rt.block_on(service.verify_password(&password, &hash)).unwrap());
            prop_assert!(!rt.block_on(service.verify_password(&other, &hash)).unwrap());
        }
    }
}
