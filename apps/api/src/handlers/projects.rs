use axum::Json;
use axum::extract::{Extension, Path, Query, State};
use keyfort_application::ValidatedCredential;
use keyfort_core::AppError;
use keyfort_domain::{ApiKeyId, CredentialKind, ProjectId, ProjectRole, UserId};
use uuid::Uuid;

use crate::dto::{
    ApiKeyGrantResponse, CreateProjectRequest, GenericMessageResponse, GrantApiKeyRequest,
    GrantIdentityRequest, IdentityGrantResponse, ProjectGrantsResponse, ProjectListQuery,
    ProjectListResponse, ProjectResponse, UpdateProjectRequest,
};
use crate::error::ApiResult;
use crate::state::AppState;

/// Gatekeeper for project-scoped routes: API-key callers may only touch
/// projects their key has been granted, and a missing grant reads as a
/// missing project. Identity (session) callers pass through.
///
/// The check runs on every request, never cached.
async fn ensure_project_access(
    state: &AppState,
    credential: &ValidatedCredential,
    project_id: ProjectId,
) -> ApiResult<()> {
    if credential.kind != CredentialKind::ApiKey {
        return Ok(());
    }

    let Some(api_key_id) = credential.api_key_id else {
        return Err(AppError::Internal("api key credential without key id".to_owned()).into());
    };

    let allowed = state
        .project_service
        .api_key_has_project_access(api_key_id, project_id)
        .await?;

    if !allowed {
        return Err(AppError::NotFound(format!("project '{project_id}' not found")).into());
    }

    Ok(())
}

/// POST /api/v1/projects - Create a project.
pub async fn create_project_handler(
    State(state): State<AppState>,
    Extension(credential): Extension<ValidatedCredential>,
    Json(payload): Json<CreateProjectRequest>,
) -> ApiResult<Json<ProjectResponse>> {
    let project = state
        .project_service
        .create_project(&payload.name, payload.description)
        .await?;

    tracing::info!(
        project_id = %project.id,
        user_id = %credential.user_id,
        "project created"
    );

    Ok(Json(ProjectResponse::from(project)))
}

/// GET /api/v1/projects - List projects.
pub async fn list_projects_handler(
    State(state): State<AppState>,
    Query(query): Query<ProjectListQuery>,
) -> ApiResult<Json<ProjectListResponse>> {
    let (projects, total) = state
        .project_service
        .list_projects(query.skip, query.limit, query.include_archived)
        .await?;

    Ok(Json(ProjectListResponse {
        items: projects.into_iter().map(ProjectResponse::from).collect(),
        total,
        skip: query.skip,
        limit: query.limit,
    }))
}

/// GET /api/v1/projects/{id} - Fetch one project.
pub async fn get_project_handler(
    State(state): State<AppState>,
    Extension(credential): Extension<ValidatedCredential>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ProjectResponse>> {
    let project_id = ProjectId::from_uuid(id);
    ensure_project_access(&state, &credential, project_id).await?;

    let project = state.project_service.get_project(project_id).await?;
    Ok(Json(ProjectResponse::from(project)))
}

/// PUT /api/v1/projects/{id} - Update a project.
pub async fn update_project_handler(
    State(state): State<AppState>,
    Extension(credential): Extension<ValidatedCredential>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProjectRequest>,
) -> ApiResult<Json<ProjectResponse>> {
    let project_id = ProjectId::from_uuid(id);
    ensure_project_access(&state, &credential, project_id).await?;

    let project = state
        .project_service
        .update_project(
            project_id,
            keyfort_application::ProjectUpdate {
                name: payload.name,
                description: payload.description,
                archived: payload.archived,
            },
        )
        .await?;

    Ok(Json(ProjectResponse::from(project)))
}

/// DELETE /api/v1/projects/{id} - Delete a project and its grants.
pub async fn delete_project_handler(
    State(state): State<AppState>,
    Extension(credential): Extension<ValidatedCredential>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<GenericMessageResponse>> {
    let project_id = ProjectId::from_uuid(id);
    ensure_project_access(&state, &credential, project_id).await?;

    state.project_service.delete_project(project_id).await?;

    Ok(Json(GenericMessageResponse {
        message: "project deleted".to_owned(),
    }))
}

/// POST /api/v1/projects/{id}/users - Grant an identity a role.
pub async fn grant_identity_handler(
    State(state): State<AppState>,
    Extension(credential): Extension<ValidatedCredential>,
    Path(id): Path<Uuid>,
    Json(payload): Json<GrantIdentityRequest>,
) -> ApiResult<Json<IdentityGrantResponse>> {
    let project_id = ProjectId::from_uuid(id);
    ensure_project_access(&state, &credential, project_id).await?;

    let role = ProjectRole::parse(&payload.role)?;
    let grant = state
        .project_service
        .grant_identity_to_project(UserId::from_uuid(payload.user_id), project_id, role)
        .await?;

    Ok(Json(IdentityGrantResponse::from(grant)))
}

/// DELETE /api/v1/projects/{id}/users/{user_id} - Revoke an identity grant.
pub async fn revoke_identity_grant_handler(
    State(state): State<AppState>,
    Extension(credential): Extension<ValidatedCredential>,
    Path((id, user_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<GenericMessageResponse>> {
    let project_id = ProjectId::from_uuid(id);
    ensure_project_access(&state, &credential, project_id).await?;

    state
        .project_service
        .revoke_identity_from_project(UserId::from_uuid(user_id), project_id)
        .await?;

    Ok(Json(GenericMessageResponse {
        message: "identity grant removed".to_owned(),
    }))
}

/// POST /api/v1/projects/{id}/api-keys - Grant an API key access.
pub async fn grant_api_key_handler(
    State(state): State<AppState>,
    Extension(credential): Extension<ValidatedCredential>,
    Path(id): Path<Uuid>,
    Json(payload): Json<GrantApiKeyRequest>,
) -> ApiResult<Json<ApiKeyGrantResponse>> {
    let project_id = ProjectId::from_uuid(id);
    ensure_project_access(&state, &credential, project_id).await?;

    let grant = state
        .project_service
        .grant_api_key_to_project(ApiKeyId::from_uuid(payload.api_key_id), project_id)
        .await?;

    Ok(Json(ApiKeyGrantResponse::from(grant)))
}

/// DELETE /api/v1/projects/{id}/api-keys/{key_id} - Revoke a key grant.
pub async fn revoke_api_key_grant_handler(
    State(state): State<AppState>,
    Extension(credential): Extension<ValidatedCredential>,
    Path((id, key_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<GenericMessageResponse>> {
    let project_id = ProjectId::from_uuid(id);
    ensure_project_access(&state, &credential, project_id).await?;

    state
        .project_service
        .revoke_api_key_from_project(ApiKeyId::from_uuid(key_id), project_id)
        .await?;

    Ok(Json(GenericMessageResponse {
        message: "API key grant removed".to_owned(),
    }))
}

/// GET /api/v1/projects/{id}/grants - List both grant edge sets.
pub async fn list_project_grants_handler(
    State(state): State<AppState>,
    Extension(credential): Extension<ValidatedCredential>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ProjectGrantsResponse>> {
    let project_id = ProjectId::from_uuid(id);
    ensure_project_access(&state, &credential, project_id).await?;

    let grants = state
        .project_service
        .list_grants_for_project(project_id)
        .await?;

    Ok(Json(ProjectGrantsResponse {
        identities: grants
            .identities
            .into_iter()
            .map(IdentityGrantResponse::from)
            .collect(),
        api_keys: grants
            .api_keys
            .into_iter()
            .map(ApiKeyGrantResponse::from)
            .collect(),
    }))
}
