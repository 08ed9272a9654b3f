//! Request and response payloads for the HTTP surface.

mod api_keys;
mod auth;
mod common;
mod projects;

pub use api_keys::{
    ApiKeyCreatedResponse, ApiKeyListItem, ApiKeyListResponse, CreateApiKeyRequest,
    UpdateApiKeyRequest,
};
pub use auth::{LoginForm, LoginResponse, RegisterRequest, RegisterResponse};
pub use common::{GenericMessageResponse, HealthResponse, PageQuery};
pub use projects::{
    ApiKeyGrantResponse, CreateProjectRequest, GrantApiKeyRequest, GrantIdentityRequest,
    IdentityGrantResponse, ProjectGrantsResponse, ProjectListQuery, ProjectListResponse,
    ProjectResponse, UpdateProjectRequest,
};
