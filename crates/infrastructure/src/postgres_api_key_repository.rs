//! PostgreSQL-backed API key repository.
//!
//! Name reservation rides on the partial unique index
//! `api_keys_owner_name_active_idx (owner_user_id, name) WHERE NOT revoked`,
//! so insert-and-reserve is a single atomic statement.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use keyfort_application::{ApiKeyRecord, ApiKeyRepository};
use keyfort_core::{AppError, AppResult};
use keyfort_domain::{ApiKeyId, UserId};

/// Name of the partial unique index that reserves key names.
const OWNER_NAME_INDEX: &str = "api_keys_owner_name_active_idx";

/// PostgreSQL implementation of the API key repository port.
#[derive(Clone)]
pub struct PostgresApiKeyRepository {
    pool: PgPool,
}

impl PostgresApiKeyRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Counts keys per lifecycle state: `(active, expired, revoked)`.
    /// Used by the observational sweep; never called on the request path.
    pub async fn lifecycle_totals(&self) -> AppResult<(i64, i64, i64)> {
        let row = sqlx::query_as::<_, (i64, i64, i64)>(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE NOT revoked AND expires_at > now()),
                COUNT(*) FILTER (WHERE NOT revoked AND expires_at <= now()),
                COUNT(*) FILTER (WHERE revoked)
            FROM api_keys
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|error| {
            AppError::StoreUnavailable(format!("failed to count api key states: {error}"))
        })?;

        Ok(row)
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ApiKeyRow {
    id: uuid::Uuid,
    owner_user_id: uuid::Uuid,
    name: String,
    secret_hash: String,
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    revoked: bool,
    last_used_at: Option<DateTime<Utc>>,
}

impl From<ApiKeyRow> for ApiKeyRecord {
    fn from(row: ApiKeyRow) -> Self {
        Self {
            id: ApiKeyId::from_uuid(row.id),
            owner_user_id: UserId::from_uuid(row.owner_user_id),
            name: row.name,
            secret_hash: row.secret_hash,
            issued_at: row.issued_at,
            expires_at: row.expires_at,
            revoked: row.revoked,
            last_used_at: row.last_used_at,
        }
    }
}

const SELECT_COLUMNS: &str =
    "id, owner_user_id, name, secret_hash, issued_at, expires_at, revoked, last_used_at";

#[async_trait]
impl ApiKeyRepository for PostgresApiKeyRepository {
    async fn create(&self, record: &ApiKeyRecord) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO api_keys
                (id, owner_user_id, name, secret_hash, issued_at, expires_at, revoked, last_used_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(record.id.as_uuid())
        .bind(record.owner_user_id.as_uuid())
        .bind(record.name.as_str())
        .bind(record.secret_hash.as_str())
        .bind(record.issued_at)
        .bind(record.expires_at)
        .bind(record.revoked)
        .bind(record.last_used_at)
        .execute(&self.pool)
        .await
        .map_err(|error| name_conflict_or_unavailable(error, &record.name))?;

        Ok(())
    }

    async fn find_by_id(&self, id: ApiKeyId) -> AppResult<Option<ApiKeyRecord>> {
        let row = sqlx::query_as::<_, ApiKeyRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM api_keys WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::StoreUnavailable(format!("failed to look up api key by id: {error}"))
        })?;

        Ok(row.map(ApiKeyRecord::from))
    }

    async fn find_by_secret_hash(&self, secret_hash: &str) -> AppResult<Option<ApiKeyRecord>> {
        let row = sqlx::query_as::<_, ApiKeyRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM api_keys WHERE secret_hash = $1"
        ))
        .bind(secret_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::StoreUnavailable(format!("failed to look up api key by secret: {error}"))
        })?;

        Ok(row.map(ApiKeyRecord::from))
    }

    async fn list_for_owner(
        &self,
        owner: UserId,
        skip: i64,
        limit: i64,
    ) -> AppResult<(Vec<ApiKeyRecord>, i64)> {
        let rows = sqlx::query_as::<_, ApiKeyRow>(&format!(
            r#"
            SELECT {SELECT_COLUMNS}
            FROM api_keys
            WHERE owner_user_id = $1
            ORDER BY issued_at DESC
            OFFSET $2
            LIMIT $3
            "#
        ))
        .bind(owner.as_uuid())
        .bind(skip)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::StoreUnavailable(format!("failed to list api keys: {error}"))
        })?;

        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM api_keys
            WHERE owner_user_id = $1
            "#,
        )
        .bind(owner.as_uuid())
        .fetch_one(&self.pool)
        .await
        .map_err(|error| {
            AppError::StoreUnavailable(format!("failed to count api keys: {error}"))
        })?;

        Ok((rows.into_iter().map(ApiKeyRecord::from).collect(), total))
    }

    async fn update_expiry(&self, id: ApiKeyId, expires_at: DateTime<Utc>) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE api_keys
            SET expires_at = $2
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .bind(expires_at)
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::StoreUnavailable(format!("failed to update api key expiry: {error}"))
        })?;

        Ok(())
    }

    async fn mark_revoked(&self, id: ApiKeyId) -> AppResult<()> {
        // Unconditional one-way write; re-revoking is a no-op by construction.
        sqlx::query(
            r#"
            UPDATE api_keys
            SET revoked = TRUE
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::StoreUnavailable(format!("failed to revoke api key: {error}"))
        })?;

        Ok(())
    }

    async fn touch_last_used(&self, id: ApiKeyId, used_at: DateTime<Utc>) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE api_keys
            SET last_used_at = $2
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .bind(used_at)
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::StoreUnavailable(format!("failed to stamp api key usage: {error}"))
        })?;

        Ok(())
    }
}

fn name_conflict_or_unavailable(error: sqlx::Error, name: &str) -> AppError {
    if let sqlx::Error::Database(ref database_error) = error
        && database_error.code().as_deref() == Some("23505")
        && database_error.constraint() == Some(OWNER_NAME_INDEX)
    {
        return AppError::NameConflict(name.to_owned());
    }

    AppError::StoreUnavailable(format!("failed to create api key: {error}"))
}
