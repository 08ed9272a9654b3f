use axum::Json;
use axum::extract::{Extension, Path, Query, State};
use keyfort_application::ValidatedCredential;
use keyfort_domain::ApiKeyId;
use uuid::Uuid;

use crate::dto::{
    ApiKeyCreatedResponse, ApiKeyListItem, ApiKeyListResponse, CreateApiKeyRequest,
    GenericMessageResponse, PageQuery, ProjectResponse, UpdateApiKeyRequest,
};
use crate::error::ApiResult;
use crate::state::AppState;

/// POST /api/v1/auth/api-keys - Issue a new API key.
///
/// The secret appears in this response and nowhere else.
pub async fn create_api_key_handler(
    State(state): State<AppState>,
    Extension(credential): Extension<ValidatedCredential>,
    Json(payload): Json<CreateApiKeyRequest>,
) -> ApiResult<Json<ApiKeyCreatedResponse>> {
    let issued = state
        .credential_service
        .issue_api_key(credential.user_id, &payload.name, payload.expires_in_days)
        .await?;

    Ok(Json(ApiKeyCreatedResponse {
        id: issued.record.id.as_uuid(),
        name: issued.record.name,
        secret: issued.secret,
        expires_at: issued.record.expires_at,
        created_at: issued.record.issued_at,
    }))
}

/// GET /api/v1/auth/api-keys - List the caller's keys.
pub async fn list_api_keys_handler(
    State(state): State<AppState>,
    Extension(credential): Extension<ValidatedCredential>,
    Query(page): Query<PageQuery>,
) -> ApiResult<Json<ApiKeyListResponse>> {
    let (records, total) = state
        .credential_service
        .list_api_keys(credential.user_id, page.skip, page.limit)
        .await?;

    Ok(Json(ApiKeyListResponse {
        items: records.into_iter().map(ApiKeyListItem::from).collect(),
        total,
        skip: page.skip,
        limit: page.limit,
    }))
}

/// PATCH /api/v1/auth/api-keys/{id} - Recompute a key's expiry window.
pub async fn update_api_key_handler(
    State(state): State<AppState>,
    Extension(credential): Extension<ValidatedCredential>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateApiKeyRequest>,
) -> ApiResult<Json<ApiKeyListItem>> {
    let record = state
        .credential_service
        .update_api_key_expiry(
            credential.user_id,
            ApiKeyId::from_uuid(id),
            payload.expires_in_days,
        )
        .await?;

    Ok(Json(ApiKeyListItem::from(record)))
}

/// DELETE /api/v1/auth/api-keys/{id} - Revoke a key.
pub async fn revoke_api_key_handler(
    State(state): State<AppState>,
    Extension(credential): Extension<ValidatedCredential>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<GenericMessageResponse>> {
    state
        .credential_service
        .revoke_api_key(credential.user_id, ApiKeyId::from_uuid(id))
        .await?;

    Ok(Json(GenericMessageResponse {
        message: "API key revoked".to_owned(),
    }))
}

/// GET /api/v1/auth/api-keys/{id}/projects - Projects granted to a key.
pub async fn list_api_key_projects_handler(
    State(state): State<AppState>,
    Extension(credential): Extension<ValidatedCredential>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<ProjectResponse>>> {
    let key_id = ApiKeyId::from_uuid(id);

    // Scope to the caller: a foreign key id behaves as missing.
    state
        .credential_service
        .get_api_key(credential.user_id, key_id)
        .await?;

    let projects = state.project_service.list_projects_for_api_key(key_id).await?;

    Ok(Json(projects.into_iter().map(ProjectResponse::from).collect()))
}
