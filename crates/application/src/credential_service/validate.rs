use chrono::Utc;

use keyfort_core::{AppError, AppResult};
use keyfort_domain::{ApiKeyId, CredentialKind, KeyLifecycle, UserId};

use super::{CredentialService, secret};

/// Outcome of a successful bearer validation: the resolved identity plus
/// the credential's kind and scope.
#[derive(Debug, Clone)]
pub struct ValidatedCredential {
    /// Identity that owns the credential.
    pub user_id: UserId,
    /// Kind resolved once from the bearer prefix.
    pub kind: CredentialKind,
    /// The matching key when the credential is an API key.
    pub api_key_id: Option<ApiKeyId>,
}

impl CredentialService {
    /// Resolves an inbound bearer value to its owning identity.
    ///
    /// The kind is decided by a single prefix check; everything after
    /// branches on that tag. API keys are looked up by secret digest;
    /// session tokens are verified locally without a store round-trip.
    ///
    /// Revocation is observed by any call that starts after the revoking
    /// write returned; the store's read-after-write consistency is the
    /// only ordering relied upon.
    pub async fn validate(&self, bearer_value: &str) -> AppResult<ValidatedCredential> {
        match CredentialKind::from_bearer(bearer_value) {
            CredentialKind::ApiKey => self.validate_api_key(bearer_value).await,
            CredentialKind::Session => self.validate_session(bearer_value),
        }
    }

    async fn validate_api_key(&self, raw_secret: &str) -> AppResult<ValidatedCredential> {
        let digest = secret::hash_secret(raw_secret);

        let record = self
            .api_key_repository
            .find_by_secret_hash(&digest)
            .await?
            .ok_or(AppError::CredentialNotFound)?;

        let now = Utc::now();
        match record.lifecycle(now) {
            KeyLifecycle::Revoked => Err(AppError::CredentialRevoked),
            KeyLifecycle::Expired => Err(AppError::CredentialExpired),
            KeyLifecycle::Active => {
                // Best-effort usage stamp; a failed write must not fail the
                // request.
                if let Err(error) = self
                    .api_key_repository
                    .touch_last_used(record.id, now)
                    .await
                {
                    tracing::warn!(
                        api_key_id = %record.id,
                        error = %error,
                        "failed to update last_used_at"
                    );
                }

                Ok(ValidatedCredential {
                    user_id: record.owner_user_id,
                    kind: CredentialKind::ApiKey,
                    api_key_id: Some(record.id),
                })
            }
        }
    }

    fn validate_session(&self, token: &str) -> AppResult<ValidatedCredential> {
        let claims = self.session_codec.decode(token)?;

        Ok(ValidatedCredential {
            user_id: UserId::from_uuid(claims.sub),
            kind: CredentialKind::Session,
            api_key_id: None,
        })
    }
}
