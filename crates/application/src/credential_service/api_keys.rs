use chrono::Utc;

use keyfort_core::{AppError, AppResult};
use keyfort_domain::{ApiKeyId, ApiKeyName, UserId, expiry_after_days};

use super::{ApiKeyRecord, CredentialService, IssuedApiKey, secret};

impl CredentialService {
    /// Issues a new named API key for `owner`.
    ///
    /// Validates the expiry range, then relies on the repository's atomic
    /// name reservation: a concurrent issue with the same name for the same
    /// owner yields exactly one success and one `NameConflict`. The raw
    /// secret is returned exactly once and never again retrievable.
    pub async fn issue_api_key(
        &self,
        owner: UserId,
        name: &str,
        expires_in_days: i64,
    ) -> AppResult<IssuedApiKey> {
        let name = ApiKeyName::new(name)?;
        let issued_at = Utc::now();
        let expires_at = expiry_after_days(issued_at, expires_in_days)?;

        let (raw_secret, secret_hash) = secret::generate_api_key_secret()?;

        let record = ApiKeyRecord {
            id: ApiKeyId::new(),
            owner_user_id: owner,
            name: name.into(),
            secret_hash,
            issued_at,
            expires_at,
            revoked: false,
            last_used_at: None,
        };

        self.api_key_repository.create(&record).await?;

        tracing::info!(
            api_key_id = %record.id,
            owner = %owner,
            name = %record.name,
            "api key issued"
        );

        Ok(IssuedApiKey {
            record,
            secret: raw_secret,
        })
    }

    /// Recomputes a key's expiry as `now + new_expires_in_days`.
    ///
    /// An expired key can be brought back this way; a revoked one cannot.
    pub async fn update_api_key_expiry(
        &self,
        owner: UserId,
        id: ApiKeyId,
        new_expires_in_days: i64,
    ) -> AppResult<ApiKeyRecord> {
        let now = Utc::now();
        let expires_at = expiry_after_days(now, new_expires_in_days)?;

        let record = self.find_owned_key(owner, id).await?;

        if record.revoked {
            return Err(AppError::AlreadyRevoked(id.to_string()));
        }

        self.api_key_repository
            .update_expiry(record.id, expires_at)
            .await?;

        Ok(ApiKeyRecord {
            expires_at,
            ..record
        })
    }

    /// Revokes an API key. One-way and idempotent: revoking an
    /// already-revoked key succeeds silently.
    pub async fn revoke_api_key(&self, owner: UserId, id: ApiKeyId) -> AppResult<()> {
        let record = self.find_owned_key(owner, id).await?;

        if record.revoked {
            return Ok(());
        }

        self.api_key_repository.mark_revoked(record.id).await?;

        tracing::info!(api_key_id = %id, owner = %owner, "api key revoked");
        Ok(())
    }

    /// Lists an owner's keys, newest first, including expired and revoked
    /// ones, with the total count for pagination.
    pub async fn list_api_keys(
        &self,
        owner: UserId,
        skip: i64,
        limit: i64,
    ) -> AppResult<(Vec<ApiKeyRecord>, i64)> {
        self.api_key_repository
            .list_for_owner(owner, skip, limit)
            .await
    }

    /// Returns one of the owner's keys by id.
    pub async fn get_api_key(&self, owner: UserId, id: ApiKeyId) -> AppResult<ApiKeyRecord> {
        self.find_owned_key(owner, id).await
    }

    /// Fetches a key and scopes it to its owner. A key that exists but
    /// belongs to another identity behaves as missing.
    async fn find_owned_key(&self, owner: UserId, id: ApiKeyId) -> AppResult<ApiKeyRecord> {
        self.api_key_repository
            .find_by_id(id)
            .await?
            .filter(|record| record.owner_user_id == owner)
            .ok_or_else(|| AppError::NotFound(format!("API key '{id}' not found")))
    }
}
