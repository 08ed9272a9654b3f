//! Project grant management ports and application service.
//!
//! Projects are the resource containers; identities and API keys reach
//! them only through explicit grant edges. Caller context (identity or key
//! id) comes from the validator's output and is passed into every call;
//! there is no ambient current-user state.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use keyfort_core::{AppError, AppResult};
use keyfort_domain::{ApiKeyId, ProjectId, ProjectName, ProjectRole, UserId};

use crate::credential_service::ApiKeyRepository;

mod grants;


/// Project record as persisted in the record store.
#[derive(Debug, Clone)]
pub struct ProjectRecord {
    /// Project identifier.
    pub id: ProjectId,
    /// Human-readable project name.
    pub name: String,
    /// Optional free-text description.
    pub description: Option<String>,
    /// Archived projects are hidden from default listings; grants are kept.
    pub archived: bool,
    /// When the project was created.
    pub created_at: DateTime<Utc>,
    /// When the project was last modified.
    pub updated_at: DateTime<Utc>,
}

/// Identity-to-project grant edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityProjectGrant {
    /// The granted identity.
    pub user_id: UserId,
    /// The target project.
    pub project_id: ProjectId,
    /// Role the identity holds on the project.
    pub role: ProjectRole,
    /// When the grant was made.
    pub granted_at: DateTime<Utc>,
}

/// Key-to-project grant edge, independent of the key owner's own
/// identity-level grants. A key may be narrower than its owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiKeyProjectGrant {
    /// The granted key.
    pub api_key_id: ApiKeyId,
    /// The target project.
    pub project_id: ProjectId,
    /// When the grant was made.
    pub granted_at: DateTime<Utc>,
}

/// Both grant edge sets for one project.
#[derive(Debug, Clone, Default)]
pub struct ProjectGrantList {
    /// Identity grants on the project.
    pub identities: Vec<IdentityProjectGrant>,
    /// API key grants on the project.
    pub api_keys: Vec<ApiKeyProjectGrant>,
}

/// Fields a project update may change. `None` leaves the field untouched.
#[derive(Debug, Clone, Default)]
pub struct ProjectUpdate {
    /// New project name.
    pub name: Option<String>,
    /// New description (`Some(None)` is not modeled; empty string clears).
    pub description: Option<String>,
    /// New archived state.
    pub archived: Option<bool>,
}

/// Repository port for project and grant persistence.
#[async_trait]
pub trait ProjectRepository: Send + Sync {
    /// Persists a new project record.
    async fn create(&self, record: &ProjectRecord) -> AppResult<()>;

    /// Finds a project by id.
    async fn find_by_id(&self, id: ProjectId) -> AppResult<Option<ProjectRecord>>;

    /// Lists projects, newest first, with the total count. Archived
    /// projects appear only when `include_archived` is set.
    async fn list(
        &self,
        skip: i64,
        limit: i64,
        include_archived: bool,
    ) -> AppResult<(Vec<ProjectRecord>, i64)>;

    /// Replaces a project record.
    async fn update(&self, record: &ProjectRecord) -> AppResult<()>;

    /// Deletes a project and every grant pointing at it. Returns whether a
    /// record existed.
    async fn delete(&self, id: ProjectId) -> AppResult<bool>;

    /// Inserts or refreshes an identity grant (role may change).
    async fn upsert_identity_grant(&self, grant: &IdentityProjectGrant) -> AppResult<()>;

    /// Removes an identity grant. Returns whether an edge existed.
    async fn delete_identity_grant(&self, user_id: UserId, project_id: ProjectId)
    -> AppResult<bool>;

    /// Inserts a key grant; granting twice is a no-op.
    async fn upsert_api_key_grant(&self, grant: &ApiKeyProjectGrant) -> AppResult<()>;

    /// Removes a key grant. Returns whether an edge existed.
    async fn delete_api_key_grant(
        &self,
        api_key_id: ApiKeyId,
        project_id: ProjectId,
    ) -> AppResult<bool>;

    /// Lists both grant edge sets for a project.
    async fn list_grants_for_project(&self, project_id: ProjectId) -> AppResult<ProjectGrantList>;

    /// Lists the projects a key has been granted, regardless of the key's
    /// lifecycle state.
    async fn list_projects_for_api_key(&self, api_key_id: ApiKeyId)
    -> AppResult<Vec<ProjectRecord>>;

    /// Whether a key-to-project edge exists.
    async fn api_key_grant_exists(
        &self,
        api_key_id: ApiKeyId,
        project_id: ProjectId,
    ) -> AppResult<bool>;
}

/// Application service for project lifecycle and access grants.
#[derive(Clone)]
pub struct ProjectService {
    project_repository: Arc<dyn ProjectRepository>,
    api_key_repository: Arc<dyn ApiKeyRepository>,
}

impl ProjectService {
    /// Creates a new project service.
    #[must_use]
    pub fn new(
        project_repository: Arc<dyn ProjectRepository>,
        api_key_repository: Arc<dyn ApiKeyRepository>,
    ) -> Self {
        Self {
            project_repository,
            api_key_repository,
        }
    }

    /// Creates a new project.
    pub async fn create_project(
        &self,
        name: &str,
        description: Option<String>,
    ) -> AppResult<ProjectRecord> {
        let name = ProjectName::new(name)?;
        let now = Utc::now();

        let record = ProjectRecord {
            id: ProjectId::new(),
            name: name.into(),
            description,
            archived: false,
            created_at: now,
            updated_at: now,
        };

        self.project_repository.create(&record).await?;
        Ok(record)
    }

    /// Returns a project by id.
    pub async fn get_project(&self, id: ProjectId) -> AppResult<ProjectRecord> {
        self.project_repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("project '{id}' not found")))
    }

    /// Lists projects with pagination.
    pub async fn list_projects(
        &self,
        skip: i64,
        limit: i64,
        include_archived: bool,
    ) -> AppResult<(Vec<ProjectRecord>, i64)> {
        self.project_repository
            .list(skip, limit, include_archived)
            .await
    }

    /// Applies a partial update to a project.
    pub async fn update_project(
        &self,
        id: ProjectId,
        update: ProjectUpdate,
    ) -> AppResult<ProjectRecord> {
        let mut record = self.get_project(id).await?;

        if let Some(name) = update.name {
            record.name = ProjectName::new(name)?.into();
        }
        if let Some(description) = update.description {
            record.description = if description.is_empty() {
                None
            } else {
                Some(description)
            };
        }
        if let Some(archived) = update.archived {
            record.archived = archived;
        }
        record.updated_at = Utc::now();

        self.project_repository.update(&record).await?;
        Ok(record)
    }

    /// Deletes a project and all its grants.
    pub async fn delete_project(&self, id: ProjectId) -> AppResult<()> {
        if !self.project_repository.delete(id).await? {
            return Err(AppError::NotFound(format!("project '{id}' not found")));
        }

        tracing::info!(project_id = %id, "project deleted");
        Ok(())
    }
}
