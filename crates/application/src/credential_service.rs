//! Credential issuance, revocation, and validation.
//!
//! API key secrets are cryptographically random, carry a recognizable
//! prefix, and are persisted only as SHA-256 digests. Session tokens are
//! signed claims verified locally, never stored server-side.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use keyfort_core::AppResult;
use keyfort_domain::{ApiKeyId, KeyLifecycle, UserId};

mod api_keys;
mod secret;
mod sessions;
mod validate;

#[cfg(test)]
mod tests;

pub use sessions::{IssuedSession, SESSION_TOKEN_TYPE, SessionClaims, SessionTokenCodec};
pub use validate::ValidatedCredential;

/// API key record as persisted in the record store.
///
/// `secret_hash` is the only stored trace of the secret; the cleartext
/// value exists exactly once, in the issue response.
#[derive(Debug, Clone)]
pub struct ApiKeyRecord {
    /// Key identifier.
    pub id: ApiKeyId,
    /// Identity that owns the key.
    pub owner_user_id: UserId,
    /// Per-owner name, unique among the owner's non-revoked keys.
    pub name: String,
    /// SHA-256 hex digest of the secret value.
    pub secret_hash: String,
    /// When the key was issued.
    pub issued_at: DateTime<Utc>,
    /// When the key stops validating. Extendable while not revoked.
    pub expires_at: DateTime<Utc>,
    /// One-way revocation flag.
    pub revoked: bool,
    /// Last successful validation, updated best-effort.
    pub last_used_at: Option<DateTime<Utc>>,
}

impl ApiKeyRecord {
    /// Lifecycle state of this key at `now`.
    #[must_use]
    pub fn lifecycle(&self, now: DateTime<Utc>) -> KeyLifecycle {
        KeyLifecycle::derive(self.revoked, self.expires_at, now)
    }
}

/// Repository port for API key persistence.
///
/// `create` is the name-reservation point: implementations must insert the
/// record and enforce per-owner name uniqueness among non-revoked keys in
/// one atomic step (a store-level unique constraint or equivalent),
/// returning `NameConflict` on violation. A check-then-insert sequence is
/// not an acceptable implementation.
#[async_trait]
pub trait ApiKeyRepository: Send + Sync {
    /// Persists a freshly issued key, reserving its name atomically.
    async fn create(&self, record: &ApiKeyRecord) -> AppResult<()>;

    /// Finds a key by its unique identifier.
    async fn find_by_id(&self, id: ApiKeyId) -> AppResult<Option<ApiKeyRecord>>;

    /// Finds a key by the digest of its secret value.
    async fn find_by_secret_hash(&self, secret_hash: &str) -> AppResult<Option<ApiKeyRecord>>;

    /// Lists keys for an owner, newest first, including expired and revoked
    /// ones. Returns the page plus the total count across all pages.
    async fn list_for_owner(
        &self,
        owner: UserId,
        skip: i64,
        limit: i64,
    ) -> AppResult<(Vec<ApiKeyRecord>, i64)>;

    /// Replaces the expiry timestamp of a key.
    async fn update_expiry(&self, id: ApiKeyId, expires_at: DateTime<Utc>) -> AppResult<()>;

    /// Sets `revoked = true`. Must be idempotent: marking an already-revoked
    /// key is a silent success.
    async fn mark_revoked(&self, id: ApiKeyId) -> AppResult<()>;

    /// Updates `last_used_at`. Callers treat failures as non-fatal.
    async fn touch_last_used(&self, id: ApiKeyId, used_at: DateTime<Utc>) -> AppResult<()>;
}

/// Result of issuing a new API key. Carries the secret in cleartext for
/// its single disclosure to the caller.
#[derive(Debug, Clone)]
pub struct IssuedApiKey {
    /// The persisted record.
    pub record: ApiKeyRecord,
    /// The raw secret, shown exactly once.
    pub secret: String,
}

/// Application service for credential issuance, revocation, and validation.
#[derive(Clone)]
pub struct CredentialService {
    api_key_repository: Arc<dyn ApiKeyRepository>,
    session_codec: Arc<dyn SessionTokenCodec>,
    session_ttl: Duration,
}

impl CredentialService {
    /// Creates a credential service with the given session time-to-live.
    #[must_use]
    pub fn new(
        api_key_repository: Arc<dyn ApiKeyRepository>,
        session_codec: Arc<dyn SessionTokenCodec>,
        session_ttl: Duration,
    ) -> Self {
        Self {
            api_key_repository,
            session_codec,
            session_ttl,
        }
    }

    /// Returns a reference to the API key repository for use by other services.
    #[must_use]
    pub fn api_key_repository(&self) -> &Arc<dyn ApiKeyRepository> {
        &self.api_key_repository
    }
}
