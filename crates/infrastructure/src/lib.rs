//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod argon2_password_hasher;
mod in_memory_auth_store;
mod jwt_session_codec;
mod postgres_api_key_repository;
mod postgres_project_repository;
mod postgres_rate_limit_repository;
mod postgres_user_repository;

pub use argon2_password_hasher::Argon2PasswordHasher;
pub use in_memory_auth_store::InMemoryAuthStore;
pub use jwt_session_codec::JwtSessionCodec;
pub use postgres_api_key_repository::PostgresApiKeyRepository;
pub use postgres_project_repository::PostgresProjectRepository;
pub use postgres_rate_limit_repository::PostgresRateLimitRepository;
pub use postgres_user_repository::PostgresUserRepository;
