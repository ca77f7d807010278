// Validation utilities module
// Provides custom validation functions for domain-specific rules

use regex::Regex;
use std::sync::OnceLock;
use validator::ValidationError;

static PHONE_NUMBER: OnceLock<Regex> = OnceLock::new();

/// Validates a phone number: optional leading '+', then 7 to 15 digits,
/// spaces or dashes allowed between groups
pub fn validate_phone_number(phone: &str) -> Result<(), ValidationError> {
    let pattern = PHONE_NUMBER.get_or_init(|| {
        Regex::new(r"^\+?[0-9](?:[0-9 \-]{5,18})[0-9]$").expect("phone number pattern is valid")
    });

    let digits = phone.chars().filter(char::is_ascii_digit).count();
    if pattern.is_match(phone) && (7..=15).contains(&digits) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_phone_number"))
    }
}

/// Validates that a free-text message is not blank
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::new("must_not_be_blank"))
    } else {
        Ok(())
    }
}

/// Validates that every id in a list is positive
pub fn validate_positive_ids(ids: &[i32]) -> Result<(), ValidationError> {
    if ids.iter().all(|id| *id > 0) {
        Ok(())
    } else {
        Err(ValidationError::new("ids_must_be_positive"))
    }
}
