//! PostgreSQL-backed rate limit counters.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use keyfort_application::{AttemptInfo, RateLimitRepository};
use keyfort_core::{AppError, AppResult};

/// PostgreSQL implementation of the rate limit repository port.
///
/// A single UPSERT per attempt keeps the counter atomic per key: the row is
/// created on first sight, incremented inside the active window, and reset
/// once the window has lapsed.
#[derive(Clone)]
pub struct PostgresRateLimitRepository {
    pool: PgPool,
}

impl PostgresRateLimitRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CounterRow {
    attempt_count: i32,
    window_started_at: DateTime<Utc>,
}

#[async_trait]
impl RateLimitRepository for PostgresRateLimitRepository {
    async fn record_attempt(&self, key: &str, window_seconds: i64) -> AppResult<AttemptInfo> {
        let row = sqlx::query_as::<_, CounterRow>(
            r#"
            INSERT INTO rate_limit_counters (key, window_started_at, attempt_count)
            VALUES ($1, now(), 1)
            ON CONFLICT (key) DO UPDATE
            SET
                attempt_count = CASE
                    WHEN rate_limit_counters.window_started_at
                         + make_interval(secs => $2::float8) < now()
                    THEN 1
                    ELSE rate_limit_counters.attempt_count + 1
                END,
                window_started_at = CASE
                    WHEN rate_limit_counters.window_started_at
                         + make_interval(secs => $2::float8) < now()
                    THEN now()
                    ELSE rate_limit_counters.window_started_at
                END
            RETURNING attempt_count, window_started_at
            "#,
        )
        .bind(key)
        .bind(window_seconds as f64)
        .fetch_one(&self.pool)
        .await
        .map_err(|error| {
            AppError::StoreUnavailable(format!("failed to record rate limit attempt: {error}"))
        })?;

        Ok(AttemptInfo {
            attempt_count: row.attempt_count,
            window_started_at: row.window_started_at,
        })
    }

    async fn cleanup_expired(&self, before: DateTime<Utc>) -> AppResult<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM rate_limit_counters
            WHERE window_started_at < $1
            "#,
        )
        .bind(before)
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::StoreUnavailable(format!("failed to clean up rate limit counters: {error}"))
        })?;

        Ok(result.rows_affected())
    }
}
