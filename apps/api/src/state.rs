use keyfort_application::{CredentialService, ProjectService, RateLimitService, UserService};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub user_service: UserService,
    pub credential_service: CredentialService,
    pub project_service: ProjectService,
    pub rate_limit_service: RateLimitService,
}
