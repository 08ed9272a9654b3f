use chrono::Utc;

use keyfort_core::{AppError, AppResult};
use keyfort_domain::{ApiKeyId, KeyLifecycle, ProjectId, ProjectRole, UserId};

use super::{
    ApiKeyProjectGrant, IdentityProjectGrant, ProjectGrantList, ProjectRecord, ProjectService,
};

impl ProjectService {
    /// Grants an identity a role on a project. Re-granting updates the role.
    pub async fn grant_identity_to_project(
        &self,
        user_id: UserId,
        project_id: ProjectId,
        role: ProjectRole,
    ) -> AppResult<IdentityProjectGrant> {
        self.get_project(project_id).await?;

        let grant = IdentityProjectGrant {
            user_id,
            project_id,
            role,
            granted_at: Utc::now(),
        };
        self.project_repository.upsert_identity_grant(&grant).await?;

        tracing::info!(
            user_id = %user_id,
            project_id = %project_id,
            role = role.as_str(),
            "identity granted to project"
        );
        Ok(grant)
    }

    /// Removes an identity's grant on a project.
    pub async fn revoke_identity_from_project(
        &self,
        user_id: UserId,
        project_id: ProjectId,
    ) -> AppResult<()> {
        let removed = self
            .project_repository
            .delete_identity_grant(user_id, project_id)
            .await?;

        if !removed {
            return Err(AppError::NotFound(format!(
                "identity '{user_id}' has no grant on project '{project_id}'"
            )));
        }
        Ok(())
    }

    /// Grants an API key access to a project.
    ///
    /// Revoked keys cannot receive new grants; expired keys can, since
    /// their expiry is extendable. Existing grants on a revoked key are
    /// left in place for audit and stay listable.
    pub async fn grant_api_key_to_project(
        &self,
        api_key_id: ApiKeyId,
        project_id: ProjectId,
    ) -> AppResult<ApiKeyProjectGrant> {
        self.get_project(project_id).await?;

        let key = self
            .api_key_repository
            .find_by_id(api_key_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("API key '{api_key_id}' not found")))?;

        if key.revoked {
            return Err(AppError::AlreadyRevoked(api_key_id.to_string()));
        }

        let grant = ApiKeyProjectGrant {
            api_key_id,
            project_id,
            granted_at: Utc::now(),
        };
        self.project_repository.upsert_api_key_grant(&grant).await?;

        tracing::info!(
            api_key_id = %api_key_id,
            project_id = %project_id,
            "api key granted to project"
        );
        Ok(grant)
    }

    /// Removes an API key's grant on a project. Works on revoked keys too:
    /// audit retention is the default, removal is an explicit choice.
    pub async fn revoke_api_key_from_project(
        &self,
        api_key_id: ApiKeyId,
        project_id: ProjectId,
    ) -> AppResult<()> {
        let removed = self
            .project_repository
            .delete_api_key_grant(api_key_id, project_id)
            .await?;

        if !removed {
            return Err(AppError::NotFound(format!(
                "API key '{api_key_id}' has no grant on project '{project_id}'"
            )));
        }
        Ok(())
    }

    /// Lists both grant edge sets for a project. Pure read.
    pub async fn list_grants_for_project(
        &self,
        project_id: ProjectId,
    ) -> AppResult<ProjectGrantList> {
        self.get_project(project_id).await?;
        self.project_repository
            .list_grants_for_project(project_id)
            .await
    }

    /// Lists the projects granted to an API key. Pure read; includes
    /// grants held by revoked or expired keys.
    pub async fn list_projects_for_api_key(
        &self,
        api_key_id: ApiKeyId,
    ) -> AppResult<Vec<ProjectRecord>> {
        self.api_key_repository
            .find_by_id(api_key_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("API key '{api_key_id}' not found")))?;

        self.project_repository
            .list_projects_for_api_key(api_key_id)
            .await
    }

    /// The access-control decision point: an API key reaches a project iff
    /// a grant edge exists and the key is neither revoked nor expired.
    ///
    /// Re-derived on every call; callers must not cache the outcome beyond
    /// the current request.
    pub async fn api_key_has_project_access(
        &self,
        api_key_id: ApiKeyId,
        project_id: ProjectId,
    ) -> AppResult<bool> {
        let Some(key) = self.api_key_repository.find_by_id(api_key_id).await? else {
            return Ok(false);
        };

        if key.lifecycle(Utc::now()) != KeyLifecycle::Active {
            return Ok(false);
        }

        self.project_repository
            .api_key_grant_exists(api_key_id, project_id)
            .await
    }
}
