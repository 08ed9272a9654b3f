//! Keyfort API composition root.

#![forbid(unsafe_code)]

mod dto;
mod error;
mod handlers;
mod middleware;
mod state;

use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::sync::Arc;

use axum::Router;
use axum::middleware::from_fn_with_state;
use axum::routing::{delete, get, post};
use chrono::Duration;
use keyfort_application::{
    CredentialService, ProjectService, RateLimitRule, RateLimitService, UserService,
};
use keyfort_core::AppError;
use keyfort_infrastructure::{
    Argon2PasswordHasher, JwtSessionCodec, PostgresApiKeyRepository, PostgresProjectRepository,
    PostgresRateLimitRepository, PostgresUserRepository,
};
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let migrate_only = env::args().nth(1).as_deref() == Some("migrate");

    let database_url = required_env("DATABASE_URL")?;
    let jwt_secret = required_env("JWT_SECRET")?;

    if jwt_secret.len() < 32 {
        return Err(AppError::Validation(
            "JWT_SECRET must be at least 32 characters".to_owned(),
        ));
    }

    let session_ttl_days = env::var("SESSION_TTL_DAYS")
        .ok()
        .map(|value| {
            value.parse::<i64>().map_err(|error| {
                AppError::Validation(format!("invalid SESSION_TTL_DAYS '{value}': {error}"))
            })
        })
        .transpose()?
        .unwrap_or(30);

    if session_ttl_days < 1 {
        return Err(AppError::Validation(
            "SESSION_TTL_DAYS must be at least 1".to_owned(),
        ));
    }

    let api_host = env::var("API_HOST").unwrap_or_else(|_| "127.0.0.1".to_owned());
    let api_port = env::var("API_PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8000);

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&database_url)
        .await
        .map_err(|error| {
            AppError::StoreUnavailable(format!("failed to connect to database: {error}"))
        })?;

    sqlx::migrate!("../../crates/infrastructure/migrations")
        .run(&pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to run migrations: {error}")))?;

    if migrate_only {
        info!("database migrations applied successfully");
        return Ok(());
    }

    // Repositories and services.
    let user_repository = Arc::new(PostgresUserRepository::new(pool.clone()));
    let password_hasher = Arc::new(Argon2PasswordHasher::new());
    let user_service = UserService::new(user_repository, password_hasher);

    let api_key_repository = Arc::new(PostgresApiKeyRepository::new(pool.clone()));
    let session_codec = Arc::new(JwtSessionCodec::new(jwt_secret.as_bytes()));
    let credential_service = CredentialService::new(
        api_key_repository.clone(),
        session_codec,
        Duration::days(session_ttl_days),
    );

    let project_repository = Arc::new(PostgresProjectRepository::new(pool.clone()));
    let project_service = ProjectService::new(project_repository, api_key_repository);

    let rate_limit_repository = Arc::new(PostgresRateLimitRepository::new(pool));
    let rate_limit_service = RateLimitService::new(rate_limit_repository);

    let app_state = AppState {
        user_service,
        credential_service,
        project_service,
        rate_limit_service,
    };

    // Rate limit rules (OWASP Credential Stuffing Prevention).
    // Login: 10 attempts per IP per 15 minutes.
    let login_rate_rule = RateLimitRule::new("login", 10, 15 * 60);
    // Registration: 5 attempts per IP per hour.
    let register_rate_rule = RateLimitRule::new("register", 5, 60 * 60);

    let login_routes = Router::new()
        .route("/api/v1/auth/login", post(handlers::auth::login_handler))
        .route_layer(from_fn_with_state(
            app_state.clone(),
            middleware::rate_limit,
        ))
        .layer(axum::Extension(login_rate_rule));

    let register_routes = Router::new()
        .route(
            "/api/v1/auth/register",
            post(handlers::auth::register_handler),
        )
        .route_layer(from_fn_with_state(
            app_state.clone(),
            middleware::rate_limit,
        ))
        .layer(axum::Extension(register_rate_rule));

    let protected_routes = Router::new()
        .route(
            "/api/v1/auth/api-keys",
            get(handlers::api_keys::list_api_keys_handler)
                .post(handlers::api_keys::create_api_key_handler),
        )
        .route(
            "/api/v1/auth/api-keys/{id}",
            delete(handlers::api_keys::revoke_api_key_handler)
                .patch(handlers::api_keys::update_api_key_handler),
        )
        .route(
            "/api/v1/auth/api-keys/{id}/projects",
            get(handlers::api_keys::list_api_key_projects_handler),
        )
        .route(
            "/api/v1/projects",
            get(handlers::projects::list_projects_handler)
                .post(handlers::projects::create_project_handler),
        )
        .route(
            "/api/v1/projects/{id}",
            get(handlers::projects::get_project_handler)
                .put(handlers::projects::update_project_handler)
                .delete(handlers::projects::delete_project_handler),
        )
        .route(
            "/api/v1/projects/{id}/grants",
            get(handlers::projects::list_project_grants_handler),
        )
        .route(
            "/api/v1/projects/{id}/users",
            post(handlers::projects::grant_identity_handler),
        )
        .route(
            "/api/v1/projects/{id}/users/{user_id}",
            delete(handlers::projects::revoke_identity_grant_handler),
        )
        .route(
            "/api/v1/projects/{id}/api-keys",
            post(handlers::projects::grant_api_key_handler),
        )
        .route(
            "/api/v1/projects/{id}/api-keys/{key_id}",
            delete(handlers::projects::revoke_api_key_grant_handler),
        )
        .route_layer(from_fn_with_state(
            app_state.clone(),
            middleware::require_auth,
        ));

    let app = Router::new()
        .route("/health", get(handlers::health::health_handler))
        .merge(login_routes)
        .merge(register_routes)
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    let host = IpAddr::from_str(&api_host)
        .map_err(|error| AppError::Internal(format!("invalid API_HOST '{api_host}': {error}")))?;
    let address = SocketAddr::from((host, api_port));

    let listener = tokio::net::TcpListener::bind(address)
        .await
        .map_err(|error| AppError::Internal(format!("failed to bind listener: {error}")))?;

    info!(%address, "keyfort-api listening");

    axum::serve(listener, app)
        .await
        .map_err(|error| AppError::Internal(format!("api server error: {error}")))
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn required_env(name: &str) -> Result<String, AppError> {
    env::var(name).map_err(|_| AppError::Validation(format!("{name} is required")))
}
