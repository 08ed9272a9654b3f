//! PostgreSQL-backed identity repository.

use async_trait::async_trait;
use sqlx::PgPool;

use keyfort_application::{UserRecord, UserRepository};
use keyfort_core::{AppError, AppResult};
use keyfort_domain::UserId;

/// PostgreSQL implementation of the identity repository port.
#[derive(Clone)]
pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: uuid::Uuid,
    email: String,
    password_hash: String,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl From<UserRow> for UserRecord {
    fn from(row: UserRow) -> Self {
        Self {
            id: UserId::from_uuid(row.id),
            email: row.email,
            password_hash: row.password_hash,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn find_by_email(&self, email: &str) -> AppResult<Option<UserRecord>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, email, password_hash, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::StoreUnavailable(format!("failed to look up user by email: {error}"))
        })?;

        Ok(row.map(UserRecord::from))
    }

    async fn find_by_id(&self, user_id: UserId) -> AppResult<Option<UserRecord>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, email, password_hash, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::StoreUnavailable(format!("failed to look up user by id: {error}"))
        })?;

        Ok(row.map(UserRecord::from))
    }

    async fn create(&self, email: &str, password_hash: &str) -> AppResult<UserRecord> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (id, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, email, password_hash, created_at
            "#,
        )
        .bind(UserId::new().as_uuid())
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|error| email_conflict_or_unavailable(error, "create user"))?;

        Ok(UserRecord::from(row))
    }
}

fn email_conflict_or_unavailable(error: sqlx::Error, operation: &str) -> AppError {
    if let sqlx::Error::Database(ref database_error) = error
        && database_error.code().as_deref() == Some("23505")
    {
        return AppError::Conflict("an account with this email already exists".to_owned());
    }

    AppError::StoreUnavailable(format!("failed to {operation}: {error}"))
}
