use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use keyfort_core::{AppError, AppResult};
use keyfort_domain::{ApiKeyId, CredentialKind, UserId};

use super::{
    ApiKeyRecord, ApiKeyRepository, CredentialService, SESSION_TOKEN_TYPE, SessionClaims,
    SessionTokenCodec, secret,
};

#[derive(Default)]
struct TestApiKeyRepo {
    keys: Mutex<Vec<ApiKeyRecord>>,
    fail_touch: AtomicBool,
}

impl TestApiKeyRepo {
    fn lock(&self) -> AppResult<MutexGuard<'_, Vec<ApiKeyRecord>>> {
        self.keys
            .lock()
            .map_err(|error| AppError::Internal(format!("failed to lock repo state: {error}")))
    }

    fn insert_raw(&self, record: ApiKeyRecord) -> AppResult<()> {
        self.lock()?.push(record);
        Ok(())
    }
}

#[async_trait]
impl ApiKeyRepository for TestApiKeyRepo {
    async fn create(&self, record: &ApiKeyRecord) -> AppResult<()> {
        // Single lock held across check and insert keeps the reservation atomic.
        let mut keys = self.lock()?;
        let conflict = keys
            .iter()
            .any(|k| k.owner_user_id == record.owner_user_id && k.name == record.name && !k.revoked);
        if conflict {
            return Err(AppError::NameConflict(record.name.clone()));
        }
        keys.push(record.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: ApiKeyId) -> AppResult<Option<ApiKeyRecord>> {
        Ok(self.lock()?.iter().find(|k| k.id == id).cloned())
    }

    async fn find_by_secret_hash(&self, secret_hash: &str) -> AppResult<Option<ApiKeyRecord>> {
        Ok(self
            .lock()?
            .iter()
            .find(|k| k.secret_hash == secret_hash)
            .cloned())
    }

    async fn list_for_owner(
        &self,
        owner: UserId,
        skip: i64,
        limit: i64,
    ) -> AppResult<(Vec<ApiKeyRecord>, i64)> {
        let keys = self.lock()?;
        let mut owned: Vec<ApiKeyRecord> = keys
            .iter()
            .filter(|k| k.owner_user_id == owner)
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.issued_at.cmp(&a.issued_at));
        let total = owned.len() as i64;
        let page = owned
            .into_iter()
            .skip(usize::try_from(skip).unwrap_or(0))
            .take(usize::try_from(limit).unwrap_or(0))
            .collect();
        Ok((page, total))
    }

    async fn update_expiry(&self, id: ApiKeyId, expires_at: DateTime<Utc>) -> AppResult<()> {
        let mut keys = self.lock()?;
        if let Some(key) = keys.iter_mut().find(|k| k.id == id) {
            key.expires_at = expires_at;
        }
        Ok(())
    }

    async fn mark_revoked(&self, id: ApiKeyId) -> AppResult<()> {
        let mut keys = self.lock()?;
        if let Some(key) = keys.iter_mut().find(|k| k.id == id) {
            key.revoked = true;
        }
        Ok(())
    }

    async fn touch_last_used(&self, id: ApiKeyId, used_at: DateTime<Utc>) -> AppResult<()> {
        if self.fail_touch.load(Ordering::SeqCst) {
            return Err(AppError::StoreUnavailable("write timed out".to_owned()));
        }
        let mut keys = self.lock()?;
        if let Some(key) = keys.iter_mut().find(|k| k.id == id) {
            key.last_used_at = Some(used_at);
        }
        Ok(())
    }
}

/// Unsigned stand-in codec: claims as plain JSON. Exercises the service's
/// dispatch and expiry handling without a signing dependency.
struct TestCodec;

impl SessionTokenCodec for TestCodec {
    fn encode(&self, claims: &SessionClaims) -> AppResult<String> {
        serde_json::to_string(claims)
            .map_err(|error| AppError::Internal(format!("failed to encode claims: {error}")))
    }

    fn decode(&self, token: &str) -> AppResult<SessionClaims> {
        let claims: SessionClaims = serde_json::from_str(token)
            .map_err(|error| AppError::CredentialMalformed(error.to_string()))?;

        if claims.token_type != SESSION_TOKEN_TYPE {
            return Err(AppError::CredentialMalformed(
                "unexpected token type".to_owned(),
            ));
        }

        if Utc::now().timestamp() >= claims.exp {
            return Err(AppError::CredentialExpired);
        }

        Ok(claims)
    }
}

fn service_with_repo() -> (CredentialService, Arc<TestApiKeyRepo>) {
    let repo = Arc::new(TestApiKeyRepo::default());
    let service = CredentialService::new(repo.clone(), Arc::new(TestCodec), Duration::days(30));
    (service, repo)
}

#[tokio::test]
async fn issued_key_expiry_is_the_exact_day_offset() -> AppResult<()> {
    let (service, _) = service_with_repo();
    let owner = UserId::new();

    let issued = service.issue_api_key(owner, "deploy-bot", 90).await?;

    assert_eq!(
        issued.record.expires_at - issued.record.issued_at,
        Duration::days(90)
    );
    Ok(())
}

#[tokio::test]
async fn expiry_day_bounds_are_inclusive() -> AppResult<()> {
    let (service, _) = service_with_repo();
    let owner = UserId::new();

    assert!(service.issue_api_key(owner, "one-day", 1).await.is_ok());
    assert!(service.issue_api_key(owner, "max-days", 27000).await.is_ok());

    let below = service.issue_api_key(owner, "zero-days", 0).await;
    assert!(matches!(below, Err(AppError::InvalidRange(_))));

    let above = service.issue_api_key(owner, "too-many", 27001).await;
    assert!(matches!(above, Err(AppError::InvalidRange(_))));
    Ok(())
}

#[tokio::test]
async fn fresh_key_validates_to_its_owner() -> AppResult<()> {
    let (service, _) = service_with_repo();
    let owner = UserId::new();

    let issued = service.issue_api_key(owner, "ci-bot", 30).await?;
    let validated = service.validate(&issued.secret).await?;

    assert_eq!(validated.user_id, owner);
    assert_eq!(validated.kind, CredentialKind::ApiKey);
    assert_eq!(validated.api_key_id, Some(issued.record.id));
    Ok(())
}

#[tokio::test]
async fn duplicate_name_for_same_owner_conflicts() -> AppResult<()> {
    let (service, _) = service_with_repo();
    let owner = UserId::new();

    service.issue_api_key(owner, "ci-bot", 90).await?;
    let second = service.issue_api_key(owner, "ci-bot", 30).await;

    assert!(matches!(second, Err(AppError::NameConflict(_))));
    Ok(())
}

#[tokio::test]
async fn same_name_is_free_for_a_different_owner() -> AppResult<()> {
    let (service, _) = service_with_repo();

    service.issue_api_key(UserId::new(), "ci-bot", 90).await?;
    assert!(
        service
            .issue_api_key(UserId::new(), "ci-bot", 90)
            .await
            .is_ok()
    );
    Ok(())
}

#[tokio::test]
async fn revoking_frees_the_name_for_reissue() -> AppResult<()> {
    let (service, _) = service_with_repo();
    let owner = UserId::new();

    let issued = service.issue_api_key(owner, "ci-bot", 90).await?;
    service.revoke_api_key(owner, issued.record.id).await?;

    assert!(service.issue_api_key(owner, "ci-bot", 30).await.is_ok());
    Ok(())
}

#[tokio::test]
async fn revocation_is_idempotent_and_terminal() -> AppResult<()> {
    let (service, _) = service_with_repo();
    let owner = UserId::new();

    let issued = service.issue_api_key(owner, "ci-bot", 90).await?;

    service.revoke_api_key(owner, issued.record.id).await?;
    // Second revoke is a silent success, same terminal state.
    service.revoke_api_key(owner, issued.record.id).await?;

    // Every subsequent validation observes the revocation.
    for _ in 0..3 {
        let result = service.validate(&issued.secret).await;
        assert!(matches!(result, Err(AppError::CredentialRevoked)));
    }
    Ok(())
}

#[tokio::test]
async fn one_day_key_expires_between_23_and_25_hours() -> AppResult<()> {
    let (service, repo) = service_with_repo();
    let owner = UserId::new();

    // A key issued 23 hours ago with a one-day window still validates...
    let issued_at = Utc::now() - Duration::hours(23);
    let (raw_secret, secret_hash) = secret::generate_api_key_secret()?;
    let record = ApiKeyRecord {
        id: ApiKeyId::new(),
        owner_user_id: owner,
        name: "one-day".to_owned(),
        secret_hash,
        issued_at,
        expires_at: issued_at + Duration::days(1),
        revoked: false,
        last_used_at: None,
    };
    repo.insert_raw(record)?;
    assert!(service.validate(&raw_secret).await.is_ok());

    // ...but one issued 25 hours ago has expired.
    let stale_issued_at = Utc::now() - Duration::hours(25);
    let (stale_secret, stale_hash) = secret::generate_api_key_secret()?;
    repo.insert_raw(ApiKeyRecord {
        id: ApiKeyId::new(),
        owner_user_id: owner,
        name: "stale-one-day".to_owned(),
        secret_hash: stale_hash,
        issued_at: stale_issued_at,
        expires_at: stale_issued_at + Duration::days(1),
        revoked: false,
        last_used_at: None,
    })?;

    let result = service.validate(&stale_secret).await;
    assert!(matches!(result, Err(AppError::CredentialExpired)));
    Ok(())
}

#[tokio::test]
async fn unknown_secret_is_not_found() {
    let (service, _) = service_with_repo();

    let result = service.validate("sk-does-not-exist").await;
    assert!(matches!(result, Err(AppError::CredentialNotFound)));
}

#[tokio::test]
async fn update_expiry_recomputes_from_now() -> AppResult<()> {
    let (service, _) = service_with_repo();
    let owner = UserId::new();

    let issued = service.issue_api_key(owner, "ci-bot", 1).await?;
    let updated = service
        .update_api_key_expiry(owner, issued.record.id, 365)
        .await?;

    let remaining = updated.expires_at - Utc::now();
    assert!(remaining > Duration::days(364));
    assert!(remaining <= Duration::days(365));
    Ok(())
}

#[tokio::test]
async fn update_expiry_on_missing_key_is_not_found() {
    let (service, _) = service_with_repo();

    let result = service
        .update_api_key_expiry(UserId::new(), ApiKeyId::new(), 30)
        .await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn update_expiry_on_revoked_key_is_rejected() -> AppResult<()> {
    let (service, _) = service_with_repo();
    let owner = UserId::new();

    let issued = service.issue_api_key(owner, "ci-bot", 90).await?;
    service.revoke_api_key(owner, issued.record.id).await?;

    let result = service
        .update_api_key_expiry(owner, issued.record.id, 90)
        .await;
    assert!(matches!(result, Err(AppError::AlreadyRevoked(_))));
    Ok(())
}

#[tokio::test]
async fn keys_are_scoped_to_their_owner() -> AppResult<()> {
    let (service, _) = service_with_repo();
    let owner = UserId::new();
    let stranger = UserId::new();

    let issued = service.issue_api_key(owner, "ci-bot", 90).await?;

    let result = service.revoke_api_key(stranger, issued.record.id).await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
    Ok(())
}

#[tokio::test]
async fn listing_pages_and_counts_all_keys() -> AppResult<()> {
    let (service, _) = service_with_repo();
    let owner = UserId::new();

    for index in 0..5 {
        let issued = service
            .issue_api_key(owner, &format!("key-{index}"), 30)
            .await?;
        if index == 0 {
            service.revoke_api_key(owner, issued.record.id).await?;
        }
    }

    let (page, total) = service.list_api_keys(owner, 0, 2).await?;
    assert_eq!(page.len(), 2);
    // Revoked keys stay listable.
    assert_eq!(total, 5);

    let (rest, _) = service.list_api_keys(owner, 4, 2).await?;
    assert_eq!(rest.len(), 1);
    Ok(())
}

#[tokio::test]
async fn successful_validation_stamps_last_used_at() -> AppResult<()> {
    let (service, repo) = service_with_repo();
    let owner = UserId::new();

    let issued = service.issue_api_key(owner, "ci-bot", 30).await?;
    assert!(issued.record.last_used_at.is_none());

    service.validate(&issued.secret).await?;

    let stored = repo
        .find_by_id(issued.record.id)
        .await?
        .ok_or_else(|| AppError::Internal("key vanished".to_owned()))?;
    assert!(stored.last_used_at.is_some());
    Ok(())
}

#[tokio::test]
async fn failed_usage_stamp_does_not_fail_validation() -> AppResult<()> {
    let (service, repo) = service_with_repo();
    let owner = UserId::new();

    let issued = service.issue_api_key(owner, "ci-bot", 30).await?;
    repo.fail_touch.store(true, Ordering::SeqCst);

    let validated = service.validate(&issued.secret).await?;
    assert_eq!(validated.user_id, owner);
    Ok(())
}

#[tokio::test]
async fn session_round_trips_through_the_codec() -> AppResult<()> {
    let (service, _) = service_with_repo();
    let user_id = UserId::new();

    let session = service.issue_session(user_id)?;
    assert_eq!(session.expires_at - session.issued_at, Duration::days(30));

    let validated = service.validate(&session.token).await?;
    assert_eq!(validated.user_id, user_id);
    assert_eq!(validated.kind, CredentialKind::Session);
    assert!(validated.api_key_id.is_none());
    Ok(())
}

#[tokio::test]
async fn garbled_session_token_is_malformed() {
    let (service, _) = service_with_repo();

    let result = service.validate("not-a-session-token").await;
    assert!(matches!(result, Err(AppError::CredentialMalformed(_))));
}

#[tokio::test]
async fn expired_session_token_is_rejected() -> AppResult<()> {
    let (service, _) = service_with_repo();
    let user_id = UserId::new();

    let expired = SessionClaims {
        sub: user_id.as_uuid(),
        iat: (Utc::now() - Duration::days(31)).timestamp(),
        exp: (Utc::now() - Duration::days(1)).timestamp(),
        token_type: SESSION_TOKEN_TYPE.to_owned(),
    };
    let token = TestCodec.encode(&expired)?;

    let result = service.validate(&token).await;
    assert!(matches!(result, Err(AppError::CredentialExpired)));
    Ok(())
}
