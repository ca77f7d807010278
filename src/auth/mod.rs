// Authentication module
// Credential hashing, session tokens, the auth gate and the account lifecycle

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod password;
pub mod repository;
pub mod service;
pub mod token;

// Re-export commonly used types
pub use error::AuthError;
pub use middleware::{require_auth, AuthGate, CurrentAccount};
pub use models::{AccountProfile, AccountType};
pub use password::PasswordService;
pub use repository::{PgUserDirectory, UserDirectory};
pub use service::AccountService;
pub use token::TokenService;
