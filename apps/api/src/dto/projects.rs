use chrono::{DateTime, Utc};
use keyfort_application::{ApiKeyProjectGrant, IdentityProjectGrant, ProjectRecord};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Incoming payload for project creation.
#[derive(Debug, Deserialize)]
pub struct CreateProjectRequest {
    pub name: String,
    pub description: Option<String>,
}

/// Incoming payload for a partial project update.
#[derive(Debug, Deserialize)]
pub struct UpdateProjectRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub archived: Option<bool>,
}

/// Pagination plus the archived-visibility switch.
#[derive(Debug, Deserialize)]
pub struct ProjectListQuery {
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub include_archived: bool,
}

fn default_limit() -> i64 {
    100
}

/// Project representation.
#[derive(Debug, Serialize)]
pub struct ProjectResponse {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub archived: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ProjectRecord> for ProjectResponse {
    fn from(record: ProjectRecord) -> Self {
        Self {
            id: record.id.as_uuid(),
            name: record.name,
            description: record.description,
            archived: record.archived,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

/// Paged project listing.
#[derive(Debug, Serialize)]
pub struct ProjectListResponse {
    pub items: Vec<ProjectResponse>,
    pub total: i64,
    pub skip: i64,
    pub limit: i64,
}

/// Incoming payload granting an identity a role on a project.
#[derive(Debug, Deserialize)]
pub struct GrantIdentityRequest {
    pub user_id: Uuid,
    pub role: String,
}

/// Incoming payload granting an API key access to a project.
#[derive(Debug, Deserialize)]
pub struct GrantApiKeyRequest {
    pub api_key_id: Uuid,
}

/// Identity grant edge.
#[derive(Debug, Serialize)]
pub struct IdentityGrantResponse {
    pub user_id: Uuid,
    pub project_id: Uuid,
    pub role: String,
    pub granted_at: DateTime<Utc>,
}

impl From<IdentityProjectGrant> for IdentityGrantResponse {
    fn from(grant: IdentityProjectGrant) -> Self {
        Self {
            user_id: grant.user_id.as_uuid(),
            project_id: grant.project_id.as_uuid(),
            role: grant.role.as_str().to_owned(),
            granted_at: grant.granted_at,
        }
    }
}

/// API key grant edge.
#[derive(Debug, Serialize)]
pub struct ApiKeyGrantResponse {
    pub api_key_id: Uuid,
    pub project_id: Uuid,
    pub granted_at: DateTime<Utc>,
}

impl From<ApiKeyProjectGrant> for ApiKeyGrantResponse {
    fn from(grant: ApiKeyProjectGrant) -> Self {
        Self {
            api_key_id: grant.api_key_id.as_uuid(),
            project_id: grant.project_id.as_uuid(),
            granted_at: grant.granted_at,
        }
    }
}

/// Both grant edge sets for one project.
#[derive(Debug, Serialize)]
pub struct ProjectGrantsResponse {
    pub identities: Vec<IdentityGrantResponse>,
    pub api_keys: Vec<ApiKeyGrantResponse>,
}
