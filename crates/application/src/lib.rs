//! Application services and ports.

#![forbid(unsafe_code)]

mod credential_service;
mod project_service;
mod rate_limit_service;
mod user_service;

pub use credential_service::{
    ApiKeyRecord, ApiKeyRepository, CredentialService, IssuedApiKey, IssuedSession,
    SESSION_TOKEN_TYPE, SessionClaims, SessionTokenCodec, ValidatedCredential,
};
pub use project_service::{
    ApiKeyProjectGrant, IdentityProjectGrant, ProjectGrantList, ProjectRecord, ProjectRepository,
    ProjectService, ProjectUpdate,
};
pub use rate_limit_service::{AttemptInfo, RateLimitRepository, RateLimitRule, RateLimitService};
pub use user_service::{PasswordHasher, UserRecord, UserRepository, UserService};
