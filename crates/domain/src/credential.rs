//! Credential domain types and lifecycle rules.
//!
//! Two bearer kinds share one identity model: session tokens (time-bound
//! only, never persisted) and API keys (named, revocable, persisted). The
//! kind is decided once per request from the literal secret prefix.

use chrono::{DateTime, Duration, Utc};
use keyfort_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Literal prefix carried by every API key secret, so the credential kind
/// can be resolved without a store lookup.
pub const API_KEY_PREFIX: &str = "sk-";

/// Minimum API key validity in days.
pub const MIN_EXPIRES_IN_DAYS: i64 = 1;

/// Maximum API key validity in days (caps expiry around year 2099).
pub const MAX_EXPIRES_IN_DAYS: i64 = 27000;

/// Maximum length of an API key name.
pub const API_KEY_NAME_MAX_LENGTH: usize = 100;

/// Unique identifier for an API key record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApiKeyId(Uuid);

impl ApiKeyId {
    /// Creates a new random API key identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an API key identifier from an existing UUID value.
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

impl Default for ApiKeyId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ApiKeyId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Kind of bearer credential, resolved once from the wire value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialKind {
    /// Short-lived signed session token obtained at login.
    Session,
    /// Long-lived named API key.
    ApiKey,
}

impl CredentialKind {
    /// Resolves the kind from a raw bearer value by its prefix.
    #[must_use]
    pub fn from_bearer(value: &str) -> Self {
        if value.starts_with(API_KEY_PREFIX) {
            Self::ApiKey
        } else {
            Self::Session
        }
    }

    /// Returns the storage/logging string for this kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Session => "session",
            Self::ApiKey => "api_key",
        }
    }
}

/// Lifecycle state of an API key.
///
/// Only `revoked` and the timestamps are persisted; `Active` and `Expired`
/// are derived at evaluation time. `Revoked` takes precedence over
/// `Expired` when both hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyLifecycle {
    /// Valid for authentication.
    Active,
    /// Expiry timestamp has passed. Terminal for validation, but the record
    /// stays listable and its expiry remains extendable.
    Expired,
    /// Explicitly revoked. Terminal in every respect.
    Revoked,
}

impl KeyLifecycle {
    /// Derives the lifecycle state from persisted fields at `now`.
    #[must_use]
    pub fn derive(revoked: bool, expires_at: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        if revoked {
            Self::Revoked
        } else if now >= expires_at {
            Self::Expired
        } else {
            Self::Active
        }
    }

    /// Returns the logging string for this state.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Expired => "expired",
            Self::Revoked => "revoked",
        }
    }
}

/// Validated API key name.
///
/// Uniqueness among an owner's non-revoked keys is enforced by the record
/// store; comparison is case-sensitive and exact, so the name is stored
/// as given.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApiKeyName(String);

impl ApiKeyName {
    /// Creates a validated API key name.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();

        if value.trim().is_empty() {
            return Err(AppError::Validation(
                "API key name must not be empty or whitespace".to_owned(),
            ));
        }

        if value.chars().count() > API_KEY_NAME_MAX_LENGTH {
            return Err(AppError::Validation(format!(
                "API key name must not exceed {API_KEY_NAME_MAX_LENGTH} characters"
            )));
        }

        Ok(Self(value))
    }

    /// Returns the underlying name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<ApiKeyName> for String {
    fn from(value: ApiKeyName) -> Self {
        value.0
    }
}

/// Computes an expiry timestamp `days` days after `issued_at`.
///
/// Fails with `InvalidRange` unless `MIN_EXPIRES_IN_DAYS <= days <=
/// MAX_EXPIRES_IN_DAYS`. Both issue and update paths go through this
/// function, so the ceiling is enforced in exactly one place.
pub fn expiry_after_days(issued_at: DateTime<Utc>, days: i64) -> AppResult<DateTime<Utc>> {
    if !(MIN_EXPIRES_IN_DAYS..=MAX_EXPIRES_IN_DAYS).contains(&days) {
        return Err(AppError::InvalidRange(format!(
            "expires_in_days must be between {MIN_EXPIRES_IN_DAYS} and {MAX_EXPIRES_IN_DAYS}, got {days}"
        )));
    }

    Ok(issued_at + Duration::days(days))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn bearer_with_prefix_is_an_api_key() {
        assert_eq!(
            CredentialKind::from_bearer("sk-abc123"),
            CredentialKind::ApiKey
        );
    }

    #[test]
    fn bearer_without_prefix_is_a_session() {
        assert_eq!(
            CredentialKind::from_bearer("eyJhbGciOiJIUzI1NiJ9.x.y"),
            CredentialKind::Session
        );
    }

    #[test]
    fn lifecycle_is_active_before_expiry() {
        let now = Utc::now();
        let state = KeyLifecycle::derive(false, now + Duration::hours(1), now);
        assert_eq!(state, KeyLifecycle::Active);
    }

    #[test]
    fn lifecycle_is_expired_at_exact_expiry_instant() {
        let now = Utc::now();
        assert_eq!(KeyLifecycle::derive(false, now, now), KeyLifecycle::Expired);
    }

    #[test]
    fn revocation_takes_precedence_over_expiry() {
        let now = Utc::now();
        let state = KeyLifecycle::derive(true, now - Duration::days(1), now);
        assert_eq!(state, KeyLifecycle::Revoked);
    }

    #[test]
    fn expiry_bounds_are_inclusive() {
        let issued_at = Utc::now();
        assert!(expiry_after_days(issued_at, MIN_EXPIRES_IN_DAYS).is_ok());
        assert!(expiry_after_days(issued_at, MAX_EXPIRES_IN_DAYS).is_ok());
        assert!(expiry_after_days(issued_at, 0).is_err());
        assert!(expiry_after_days(issued_at, MAX_EXPIRES_IN_DAYS + 1).is_err());
    }

    #[test]
    fn out_of_range_expiry_is_an_invalid_range_failure() {
        let result = expiry_after_days(Utc::now(), 27001);
        assert!(matches!(
            result,
            Err(keyfort_core::AppError::InvalidRange(_))
        ));
    }

    #[test]
    fn empty_name_is_rejected() {
        assert!(ApiKeyName::new("   ").is_err());
    }

    #[test]
    fn overlong_name_is_rejected() {
        assert!(ApiKeyName::new("k".repeat(API_KEY_NAME_MAX_LENGTH + 1)).is_err());
    }

    #[test]
    fn name_comparison_material_is_preserved_exactly() -> keyfort_core::AppResult<()> {
        let name = ApiKeyName::new("CI-Bot")?;
        assert_eq!(name.as_str(), "CI-Bot");
        Ok(())
    }

    proptest! {
        #[test]
        fn valid_day_counts_produce_exact_offsets(days in MIN_EXPIRES_IN_DAYS..=MAX_EXPIRES_IN_DAYS) {
            let issued_at = Utc::now();
            let expires_at = expiry_after_days(issued_at, days)
                .map_err(|_| TestCaseError::fail("expiry within bounds must succeed"))?;
            prop_assert_eq!(expires_at - issued_at, Duration::days(days));
        }
    }
}
