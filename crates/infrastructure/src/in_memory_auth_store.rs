//! In-memory implementation of every repository port.
//!
//! Backs tests and local development without PostgreSQL. One mutex guards
//! all state, so the name reservation in `ApiKeyRepository::create` is a
//! genuine check-and-insert under a single lock, matching the atomicity
//! contract the Postgres adapter gets from its unique index.

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use keyfort_application::{
    ApiKeyProjectGrant, ApiKeyRecord, ApiKeyRepository, IdentityProjectGrant, ProjectGrantList,
    ProjectRecord, ProjectRepository, UserRecord, UserRepository,
};
use keyfort_core::{AppError, AppResult};
use keyfort_domain::{ApiKeyId, ProjectId, UserId};

#[derive(Default)]
struct StoreState {
    users: Vec<UserRecord>,
    api_keys: Vec<ApiKeyRecord>,
    projects: Vec<ProjectRecord>,
    identity_grants: Vec<IdentityProjectGrant>,
    api_key_grants: Vec<ApiKeyProjectGrant>,
}

/// In-memory record store implementing all repository ports.
#[derive(Default)]
pub struct InMemoryAuthStore {
    state: Mutex<StoreState>,
}

impl InMemoryAuthStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> AppResult<MutexGuard<'_, StoreState>> {
        self.state
            .lock()
            .map_err(|error| AppError::Internal(format!("failed to lock store state: {error}")))
    }
}

#[async_trait]
impl UserRepository for InMemoryAuthStore {
    async fn find_by_email(&self, email: &str) -> AppResult<Option<UserRecord>> {
        Ok(self.lock()?.users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, user_id: UserId) -> AppResult<Option<UserRecord>> {
        Ok(self.lock()?.users.iter().find(|u| u.id == user_id).cloned())
    }

    async fn create(&self, email: &str, password_hash: &str) -> AppResult<UserRecord> {
        let mut state = self.lock()?;
        if state.users.iter().any(|u| u.email == email) {
            return Err(AppError::Conflict(
                "an account with this email already exists".to_owned(),
            ));
        }

        let record = UserRecord {
            id: UserId::new(),
            email: email.to_owned(),
            password_hash: password_hash.to_owned(),
            created_at: Utc::now(),
        };
        state.users.push(record.clone());
        Ok(record)
    }
}

#[async_trait]
impl ApiKeyRepository for InMemoryAuthStore {
    async fn create(&self, record: &ApiKeyRecord) -> AppResult<()> {
        let mut state = self.lock()?;
        let conflict = state
            .api_keys
            .iter()
            .any(|k| k.owner_user_id == record.owner_user_id && k.name == record.name && !k.revoked);
        if conflict {
            return Err(AppError::NameConflict(record.name.clone()));
        }
        state.api_keys.push(record.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: ApiKeyId) -> AppResult<Option<ApiKeyRecord>> {
        Ok(self.lock()?.api_keys.iter().find(|k| k.id == id).cloned())
    }

    async fn find_by_secret_hash(&self, secret_hash: &str) -> AppResult<Option<ApiKeyRecord>> {
        Ok(self
            .lock()?
            .api_keys
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
        let state = self.lock()?;
        let mut owned: Vec<ApiKeyRecord> = state
            .api_keys
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
        let mut state = self.lock()?;
        if let Some(key) = state.api_keys.iter_mut().find(|k| k.id == id) {
            key.expires_at = expires_at;
        }
        Ok(())
    }

    async fn mark_revoked(&self, id: ApiKeyId) -> AppResult<()> {
        let mut state = self.lock()?;
        if let Some(key) = state.api_keys.iter_mut().find(|k| k.id == id) {
            key.revoked = true;
        }
        Ok(())
    }

    async fn touch_last_used(&self, id: ApiKeyId, used_at: DateTime<Utc>) -> AppResult<()> {
        let mut state = self.lock()?;
        if let Some(key) = state.api_keys.iter_mut().find(|k| k.id == id) {
            key.last_used_at = Some(used_at);
        }
        Ok(())
    }
}

#[async_trait]
impl ProjectRepository for InMemoryAuthStore {
    async fn create(&self, record: &ProjectRecord) -> AppResult<()> {
        self.lock()?.projects.push(record.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: ProjectId) -> AppResult<Option<ProjectRecord>> {
        Ok(self.lock()?.projects.iter().find(|p| p.id == id).cloned())
    }

    async fn list(
        &self,
        skip: i64,
        limit: i64,
        include_archived: bool,
    ) -> AppResult<(Vec<ProjectRecord>, i64)> {
        let state = self.lock()?;
        let mut visible: Vec<ProjectRecord> = state
            .projects
            .iter()
            .filter(|p| include_archived || !p.archived)
            .cloned()
            .collect();
        visible.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let total = visible.len() as i64;
        let page = visible
            .into_iter()
            .skip(usize::try_from(skip).unwrap_or(0))
            .take(usize::try_from(limit).unwrap_or(0))
            .collect();
        Ok((page, total))
    }

    async fn update(&self, record: &ProjectRecord) -> AppResult<()> {
        let mut state = self.lock()?;
        if let Some(existing) = state.projects.iter_mut().find(|p| p.id == record.id) {
            *existing = record.clone();
        }
        Ok(())
    }

    async fn delete(&self, id: ProjectId) -> AppResult<bool> {
        let mut state = self.lock()?;
        let before = state.projects.len();
        state.projects.retain(|p| p.id != id);
        state.identity_grants.retain(|g| g.project_id != id);
        state.api_key_grants.retain(|g| g.project_id != id);
        Ok(state.projects.len() < before)
    }

    async fn upsert_identity_grant(&self, grant: &IdentityProjectGrant) -> AppResult<()> {
        let mut state = self.lock()?;
        state
            .identity_grants
            .retain(|g| !(g.user_id == grant.user_id && g.project_id == grant.project_id));
        state.identity_grants.push(grant.clone());
        Ok(())
    }

    async fn delete_identity_grant(
        &self,
        user_id: UserId,
        project_id: ProjectId,
    ) -> AppResult<bool> {
        let mut state = self.lock()?;
        let before = state.identity_grants.len();
        state
            .identity_grants
            .retain(|g| !(g.user_id == user_id && g.project_id == project_id));
        Ok(state.identity_grants.len() < before)
    }

    async fn upsert_api_key_grant(&self, grant: &ApiKeyProjectGrant) -> AppResult<()> {
        let mut state = self.lock()?;
        let exists = state
            .api_key_grants
            .iter()
            .any(|g| g.api_key_id == grant.api_key_id && g.project_id == grant.project_id);
        if !exists {
            state.api_key_grants.push(grant.clone());
        }
        Ok(())
    }

    async fn delete_api_key_grant(
        &self,
        api_key_id: ApiKeyId,
        project_id: ProjectId,
    ) -> AppResult<bool> {
        let mut state = self.lock()?;
        let before = state.api_key_grants.len();
        state
            .api_key_grants
            .retain(|g| !(g.api_key_id == api_key_id && g.project_id == project_id));
        Ok(state.api_key_grants.len() < before)
    }

    async fn list_grants_for_project(&self, project_id: ProjectId) -> AppResult<ProjectGrantList> {
        let state = self.lock()?;
        Ok(ProjectGrantList {
            identities: state
                .identity_grants
                .iter()
                .filter(|g| g.project_id == project_id)
                .cloned()
                .collect(),
            api_keys: state
                .api_key_grants
                .iter()
                .filter(|g| g.project_id == project_id)
                .cloned()
                .collect(),
        })
    }

    async fn list_projects_for_api_key(
        &self,
        api_key_id: ApiKeyId,
    ) -> AppResult<Vec<ProjectRecord>> {
        let state = self.lock()?;
        let project_ids: Vec<ProjectId> = state
            .api_key_grants
            .iter()
            .filter(|g| g.api_key_id == api_key_id)
            .map(|g| g.project_id)
            .collect();
        Ok(state
            .projects
            .iter()
            .filter(|p| project_ids.contains(&p.id))
            .cloned()
            .collect())
    }

    async fn api_key_grant_exists(
        &self,
        api_key_id: ApiKeyId,
        project_id: ProjectId,
    ) -> AppResult<bool> {
        Ok(self
            .lock()?
            .api_key_grants
            .iter()
            .any(|g| g.api_key_id == api_key_id && g.project_id == project_id))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Duration;
    use keyfort_application::CredentialService;
    use keyfort_core::{AppError, AppResult};
    use keyfort_domain::UserId;

    use crate::JwtSessionCodec;

    use super::InMemoryAuthStore;

    fn credential_service(store: Arc<InMemoryAuthStore>) -> CredentialService {
        CredentialService::new(
            store,
            Arc::new(JwtSessionCodec::new(b"a-32-byte-minimum-signing-secret")),
            Duration::days(30),
        )
    }

    #[tokio::test]
    async fn concurrent_issues_with_one_name_yield_one_conflict() -> AppResult<()> {
        let store = Arc::new(InMemoryAuthStore::new());
        let owner = UserId::new();

        let first_service = credential_service(store.clone());
        let second_service = credential_service(store);

        let first = tokio::spawn(async move {
            first_service.issue_api_key(owner, "ci-bot", 90).await
        });
        let second = tokio::spawn(async move {
            second_service.issue_api_key(owner, "ci-bot", 30).await
        });

        let outcomes = [
            first
                .await
                .map_err(|error| AppError::Internal(format!("task panicked: {error}")))?,
            second
                .await
                .map_err(|error| AppError::Internal(format!("task panicked: {error}")))?,
        ];

        let successes = outcomes.iter().filter(|o| o.is_ok()).count();
        let conflicts = outcomes
            .iter()
            .filter(|o| matches!(o, Err(AppError::NameConflict(_))))
            .count();

        assert_eq!(successes, 1);
        assert_eq!(conflicts, 1);
        Ok(())
    }

    #[tokio::test]
    async fn issued_key_round_trips_through_the_store() -> AppResult<()> {
        let store = Arc::new(InMemoryAuthStore::new());
        let owner = UserId::new();
        let service = credential_service(store);

        let issued = service.issue_api_key(owner, "deploy", 30).await?;
        let validated = service.validate(&issued.secret).await?;

        assert_eq!(validated.user_id, owner);
        Ok(())
    }
}
