// Runtime configuration read from the environment

use std::str::FromStr;

use chrono::Duration;

/// Configuration loading errors
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be set in environment")]
    Missing(&'static str),

    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub database_max_connections: u32,
    pub host: String,
    pub port: u16,
    pub secret_key: String,
    pub session_ttl_days: i64,
    pub reset_token_ttl_minutes: i64,
    pub bcrypt_cost: u32,
    pub email_host: String,
    /// Also the organisation inbox: sender of reset mail, recipient of contact-us mail
    pub email_username: String,
    pub email_password: String,
    pub rate_limit_per_hour: u32,
}

impl AppConfig {
    /// Load configuration from process environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| lookup(name).ok_or(ConfigError::Missing(name));

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            database_max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 5)?,
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(&lookup, "PORT", 3000)?,
            secret_key: required("SECRET_KEY")?,
            session_ttl_days: parse_or(&lookup, "SESSION_TTL_DAYS", 365)?,
            reset_token_ttl_minutes: parse_or(&lookup, "RESET_TOKEN_TTL_MINUTES", 10)?,
            bcrypt_cost: parse_or(&lookup, "BCRYPT_COST", 12)?,
            email_host: required("EMAIL_HOST")?,
            email_username: required("EMAIL_USERNAME")?,
            email_password: required("EMAIL_PASSWORD")?,
            rate_limit_per_hour: parse_or(&lookup, "RATE_LIMIT_PER_HOUR", 100)?,
        })
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::days(self.session_ttl_days)
    }

    pub fn reset_token_ttl(&self) -> Duration {
        Duration::minutes(self.reset_token_ttl_minutes)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T, F>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        None => Ok(default),
    }
}
