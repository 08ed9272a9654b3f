//! Identity domain types.
//!
//! The identity store owns these records; the credential machinery only
//! references identities by id.

use keyfort_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for an identity record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(Uuid);

impl UserId {
    /// Creates a new random identity identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an identity identifier from an existing UUID value.
    #[must_use]
    pub fn from_uuid(value: Uuid) -> Self {
        Self(value)
    }

    /// Returns the underlying UUID value.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Validated, canonicalized (lowercase) email address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Creates a validated email address.
    ///
    /// Structural checks only: one `@`, non-empty local part, domain with a
    /// dot, total length within the RFC 5321 bound.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        let canonical = value.trim().to_lowercase();

        let Some((local, domain)) = canonical.split_once('@') else {
            return Err(AppError::Validation(
                "email address must contain '@'".to_owned(),
            ));
        };

        if local.is_empty() || domain.is_empty() || !domain.contains('.') || domain.contains('@') {
            return Err(AppError::Validation(format!(
                "'{canonical}' is not a valid email address"
            )));
        }

        if canonical.len() > 254 {
            return Err(AppError::Validation(
                "email address must not exceed 254 characters".to_owned(),
            ));
        }

        Ok(Self(canonical))
    }

    /// Returns the canonical email string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<EmailAddress> for String {
    fn from(value: EmailAddress) -> Self {
        value.0
    }
}

/// Minimum password length accepted at registration.
pub const PASSWORD_MIN_LENGTH: usize = 8;

/// Maximum password length accepted at registration.
pub const PASSWORD_MAX_LENGTH: usize = 64;

/// Validates plaintext password length bounds.
///
/// Strength policy beyond length is out of scope here; the bounds exist so
/// the hasher is never fed degenerate input.
pub fn validate_password(password: &str) -> AppResult<()> {
    let char_count = password.chars().count();

    if char_count < PASSWORD_MIN_LENGTH {
        return Err(AppError::Validation(format!(
            "password must be at least {PASSWORD_MIN_LENGTH} characters"
        )));
    }

    if char_count > PASSWORD_MAX_LENGTH {
        return Err(AppError::Validation(format!(
            "password must not exceed {PASSWORD_MAX_LENGTH} characters"
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_is_canonicalized_to_lowercase() -> keyfort_core::AppResult<()> {
        let email = EmailAddress::new("  Dev@Example.COM ")?;
        assert_eq!(email.as_str(), "dev@example.com");
        Ok(())
    }

    #[test]
    fn email_without_at_is_rejected() {
        assert!(EmailAddress::new("devexample.com").is_err());
    }

    #[test]
    fn email_with_dotless_domain_is_rejected() {
        assert!(EmailAddress::new("dev@localhost").is_err());
    }

    #[test]
    fn email_with_empty_local_part_is_rejected() {
        assert!(EmailAddress::new("@example.com").is_err());
    }

    #[test]
    fn short_password_is_rejected() {
        assert!(validate_password("seven77").is_err());
    }

    #[test]
    fn boundary_password_lengths_are_accepted() {
        assert!(validate_password(&"a".repeat(PASSWORD_MIN_LENGTH)).is_ok());
        assert!(validate_password(&"a".repeat(PASSWORD_MAX_LENGTH)).is_ok());
    }

    #[test]
    fn overlong_password_is_rejected() {
        assert!(validate_password(&"a".repeat(PASSWORD_MAX_LENGTH + 1)).is_err());
    }
}
