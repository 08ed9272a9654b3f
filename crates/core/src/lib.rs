//! Shared primitives for all Rust crates in Keyfort.

#![forbid(unsafe_code)]

use thiserror::Error;

/// Result type used across Keyfort crates.
pub type AppResult<T> = Result<T, AppError>;

/// Failure taxonomy for credential and grant operations.
///
/// Every variant is a recoverable, typed failure with no partial state
/// changes behind it. `StoreUnavailable` is the only class callers may
/// retry; the core itself never retries.
#[derive(Debug, Error)]
pub enum AppError {
    /// Email/password pair did not match a known identity.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// A non-revoked API key with this name already exists for the owner.
    #[error("an API key named '{0}' already exists")]
    NameConflict(String),

    /// Bearer value did not resolve to a stored credential.
    #[error("credential not found")]
    CredentialNotFound,

    /// Credential expiry timestamp has passed.
    #[error("credential expired")]
    CredentialExpired,

    /// Credential was revoked by its owner.
    #[error("credential revoked")]
    CredentialRevoked,

    /// Bearer value could not be parsed or its signature verified.
    #[error("malformed credential: {0}")]
    CredentialMalformed(String),

    /// Numeric input outside its documented bounds.
    #[error("invalid range: {0}")]
    InvalidRange(String),

    /// Mutation attempted on a revoked API key.
    #[error("API key '{0}' is already revoked")]
    AlreadyRevoked(String),

    /// Invalid input or violated invariant.
    #[error("validation error: {0}")]
    Validation(String),

    /// Requested resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Write operation conflicts with existing state.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Too many attempts within the current window.
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// The record store failed unexpectedly.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// Internal unexpected error outside the record store.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Whether this is one of the credential-validation failures that must
    /// collapse into a single unauthorized outcome at the transport
    /// boundary. The distinct kind stays available for logging.
    #[must_use]
    pub fn is_credential_failure(&self) -> bool {
        matches!(
            self,
            Self::InvalidCredentials
                | Self::CredentialNotFound
                | Self::CredentialExpired
                | Self::CredentialRevoked
                | Self::CredentialMalformed(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::AppError;

    #[test]
    fn credential_failures_are_flagged() {
        assert!(AppError::CredentialNotFound.is_credential_failure());
        assert!(AppError::CredentialRevoked.is_credential_failure());
        assert!(AppError::CredentialExpired.is_credential_failure());
        assert!(AppError::CredentialMalformed("bad".to_owned()).is_credential_failure());
        assert!(AppError::InvalidCredentials.is_credential_failure());
    }

    #[test]
    fn non_credential_failures_are_not_flagged() {
        assert!(!AppError::NotFound("project".to_owned()).is_credential_failure());
        assert!(!AppError::NameConflict("ci-bot".to_owned()).is_credential_failure());
        assert!(!AppError::StoreUnavailable("timeout".to_owned()).is_credential_failure());
    }
}
