//! PostgreSQL-backed project and grant repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use keyfort_application::{
    ApiKeyProjectGrant, IdentityProjectGrant, ProjectGrantList, ProjectRecord, ProjectRepository,
};
use keyfort_core::{AppError, AppResult};
use keyfort_domain::{ApiKeyId, ProjectId, ProjectRole, UserId};

/// PostgreSQL implementation of the project repository port.
#[derive(Clone)]
pub struct PostgresProjectRepository {
    pool: PgPool,
}

impl PostgresProjectRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ProjectRow {
    id: uuid::Uuid,
    name: String,
    description: Option<String>,
    archived: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProjectRow> for ProjectRecord {
    fn from(row: ProjectRow) -> Self {
        Self {
            id: ProjectId::from_uuid(row.id),
            name: row.name,
            description: row.description,
            archived: row.archived,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct IdentityGrantRow {
    user_id: uuid::Uuid,
    project_id: uuid::Uuid,
    role: String,
    granted_at: DateTime<Utc>,
}

impl TryFrom<IdentityGrantRow> for IdentityProjectGrant {
    type Error = AppError;

    fn try_from(row: IdentityGrantRow) -> Result<Self, Self::Error> {
        Ok(Self {
            user_id: UserId::from_uuid(row.user_id),
            project_id: ProjectId::from_uuid(row.project_id),
            role: ProjectRole::parse(row.role.as_str())?,
            granted_at: row.granted_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ApiKeyGrantRow {
    api_key_id: uuid::Uuid,
    project_id: uuid::Uuid,
    granted_at: DateTime<Utc>,
}

impl From<ApiKeyGrantRow> for ApiKeyProjectGrant {
    fn from(row: ApiKeyGrantRow) -> Self {
        Self {
            api_key_id: ApiKeyId::from_uuid(row.api_key_id),
            project_id: ProjectId::from_uuid(row.project_id),
            granted_at: row.granted_at,
        }
    }
}

#[async_trait]
impl ProjectRepository for PostgresProjectRepository {
    async fn create(&self, record: &ProjectRecord) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO projects (id, name, description, archived, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(record.id.as_uuid())
        .bind(record.name.as_str())
        .bind(record.description.as_deref())
        .bind(record.archived)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::StoreUnavailable(format!("failed to create project: {error}"))
        })?;

        Ok(())
    }

    async fn find_by_id(&self, id: ProjectId) -> AppResult<Option<ProjectRecord>> {
        let row = sqlx::query_as::<_, ProjectRow>(
            r#"
            SELECT id, name, description, archived, created_at, updated_at
            FROM projects
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::StoreUnavailable(format!("failed to look up project: {error}"))
        })?;

        Ok(row.map(ProjectRecord::from))
    }

    async fn list(
        &self,
        skip: i64,
        limit: i64,
        include_archived: bool,
    ) -> AppResult<(Vec<ProjectRecord>, i64)> {
        let rows = sqlx::query_as::<_, ProjectRow>(
            r#"
            SELECT id, name, description, archived, created_at, updated_at
            FROM projects
            WHERE $3 OR NOT archived
            ORDER BY created_at DESC
            OFFSET $1
            LIMIT $2
            "#,
        )
        .bind(skip)
        .bind(limit)
        .bind(include_archived)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::StoreUnavailable(format!("failed to list projects: {error}"))
        })?;

        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM projects
            WHERE $1 OR NOT archived
            "#,
        )
        .bind(include_archived)
        .fetch_one(&self.pool)
        .await
        .map_err(|error| {
            AppError::StoreUnavailable(format!("failed to count projects: {error}"))
        })?;

        Ok((rows.into_iter().map(ProjectRecord::from).collect(), total))
    }

    async fn update(&self, record: &ProjectRecord) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE projects
            SET name = $2, description = $3, archived = $4, updated_at = $5
            WHERE id = $1
            "#,
        )
        .bind(record.id.as_uuid())
        .bind(record.name.as_str())
        .bind(record.description.as_deref())
        .bind(record.archived)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::StoreUnavailable(format!("failed to update project: {error}"))
        })?;

        Ok(())
    }

    async fn delete(&self, id: ProjectId) -> AppResult<bool> {
        // Grant rows go with the project via ON DELETE CASCADE.
        let result = sqlx::query(
            r#"
            DELETE FROM projects
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::StoreUnavailable(format!("failed to delete project: {error}"))
        })?;

        Ok(result.rows_affected() > 0)
    }

    async fn upsert_identity_grant(&self, grant: &IdentityProjectGrant) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO identity_project_grants (user_id, project_id, role, granted_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id, project_id) DO UPDATE
            SET role = EXCLUDED.role
            "#,
        )
        .bind(grant.user_id.as_uuid())
        .bind(grant.project_id.as_uuid())
        .bind(grant.role.as_str())
        .bind(grant.granted_at)
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::StoreUnavailable(format!("failed to grant identity to project: {error}"))
        })?;

        Ok(())
    }

    async fn delete_identity_grant(
        &self,
        user_id: UserId,
        project_id: ProjectId,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            DELETE FROM identity_project_grants
            WHERE user_id = $1 AND project_id = $2
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(project_id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::StoreUnavailable(format!("failed to revoke identity grant: {error}"))
        })?;

        Ok(result.rows_affected() > 0)
    }

    async fn upsert_api_key_grant(&self, grant: &ApiKeyProjectGrant) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO api_key_project_grants (api_key_id, project_id, granted_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (api_key_id, project_id) DO NOTHING
            "#,
        )
        .bind(grant.api_key_id.as_uuid())
        .bind(grant.project_id.as_uuid())
        .bind(grant.granted_at)
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::StoreUnavailable(format!("failed to grant api key to project: {error}"))
        })?;

        Ok(())
    }

    async fn delete_api_key_grant(
        &self,
        api_key_id: ApiKeyId,
        project_id: ProjectId,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            DELETE FROM api_key_project_grants
            WHERE api_key_id = $1 AND project_id = $2
            "#,
        )
        .bind(api_key_id.as_uuid())
        .bind(project_id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::StoreUnavailable(format!("failed to revoke api key grant: {error}"))
        })?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_grants_for_project(&self, project_id: ProjectId) -> AppResult<ProjectGrantList> {
        let identity_rows = sqlx::query_as::<_, IdentityGrantRow>(
            r#"
            SELECT user_id, project_id, role, granted_at
            FROM identity_project_grants
            WHERE project_id = $1
            ORDER BY granted_at
            "#,
        )
        .bind(project_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::StoreUnavailable(format!("failed to list identity grants: {error}"))
        })?;

        let api_key_rows = sqlx::query_as::<_, ApiKeyGrantRow>(
            r#"
            SELECT api_key_id, project_id, granted_at
            FROM api_key_project_grants
            WHERE project_id = $1
            ORDER BY granted_at
            "#,
        )
        .bind(project_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::StoreUnavailable(format!("failed to list api key grants: {error}"))
        })?;

        let identities = identity_rows
            .into_iter()
            .map(IdentityProjectGrant::try_from)
            .collect::<AppResult<Vec<_>>>()?;

        Ok(ProjectGrantList {
            identities,
            api_keys: api_key_rows
                .into_iter()
                .map(ApiKeyProjectGrant::from)
                .collect(),
        })
    }

    async fn list_projects_for_api_key(
        &self,
        api_key_id: ApiKeyId,
    ) -> AppResult<Vec<ProjectRecord>> {
        let rows = sqlx::query_as::<_, ProjectRow>(
            r#"
            SELECT p.id, p.name, p.description, p.archived, p.created_at, p.updated_at
            FROM projects p
            JOIN api_key_project_grants g ON g.project_id = p.id
            WHERE g.api_key_id = $1
            ORDER BY g.granted_at
            "#,
        )
        .bind(api_key_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::StoreUnavailable(format!("failed to list projects for api key: {error}"))
        })?;

        Ok(rows.into_iter().map(ProjectRecord::from).collect())
    }

    async fn api_key_grant_exists(
        &self,
        api_key_id: ApiKeyId,
        project_id: ProjectId,
    ) -> AppResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1
                FROM api_key_project_grants
                WHERE api_key_id = $1 AND project_id = $2
            )
            "#,
        )
        .bind(api_key_id.as_uuid())
        .bind(project_id.as_uuid())
        .fetch_one(&self.pool)
        .await
        .map_err(|error| {
            AppError::StoreUnavailable(format!("failed to check api key grant: {error}"))
        })?;

        Ok(exists)
    }
}
