//! Fixed-window rate limiting for the authentication endpoints.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use keyfort_core::{AppError, AppResult};

/// Configuration for a rate limit rule.
#[derive(Debug, Clone)]
pub struct RateLimitRule {
    /// Endpoint category name (e.g., "login", "register").
    pub category: String,
    /// Maximum number of attempts allowed in the window.
    pub max_attempts: i32,
    /// Window duration in seconds.
    pub window_seconds: i64,
}

impl RateLimitRule {
    /// Creates a new rate limit rule.
    #[must_use]
    pub fn new(category: impl Into<String>, max_attempts: i32, window_seconds: i64) -> Self {
        Self {
            category: category.into(),
            max_attempts,
            window_seconds,
        }
    }
}

/// Counter state for the current window of one key.
#[derive(Debug, Clone)]
pub struct AttemptInfo {
    /// Attempts in the active window, including this one.
    pub attempt_count: i32,
    /// When the active window started.
    pub window_started_at: DateTime<Utc>,
}

/// Repository port for rate limit counters.
#[async_trait]
pub trait RateLimitRepository: Send + Sync {
    /// Records an attempt for the key, resetting the counter when the
    /// previous window has lapsed. Atomic per key.
    async fn record_attempt(&self, key: &str, window_seconds: i64) -> AppResult<AttemptInfo>;

    /// Removes counters whose window started before the cutoff.
    async fn cleanup_expired(&self, before: DateTime<Utc>) -> AppResult<u64>;
}

/// Application service for rate limiting.
#[derive(Clone)]
pub struct RateLimitService {
    repository: Arc<dyn RateLimitRepository>,
}

impl RateLimitService {
    /// Creates a new rate limit service.
    #[must_use]
    pub fn new(repository: Arc<dyn RateLimitRepository>) -> Self {
        Self { repository }
    }

    /// Records an attempt under `rule` for `identifier` (typically a client
    /// IP) and fails with `RateLimited` once the window is over budget.
    pub async fn check_rate_limit(&self, rule: &RateLimitRule, identifier: &str) -> AppResult<()> {
        let key = format!("{}:{identifier}", rule.category);
        let info = self
            .repository
            .record_attempt(&key, rule.window_seconds)
            .await?;

        if info.attempt_count > rule.max_attempts {
            return Err(AppError::RateLimited(
                "too many requests, please try again later".to_owned(),
            ));
        }

        Ok(())
    }
}
