//! Keyfort expiry sweep worker.
//!
//! Purely observational: expiry is derived from timestamps at validation
//! time, so nothing here mutates records. The sweep exists to give
//! operators a periodic census of key lifecycle states.

#![forbid(unsafe_code)]

use std::env;
use std::time::Duration;

use keyfort_core::{AppError, AppResult};
use keyfort_infrastructure::PostgresApiKeyRepository;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone)]
struct SweepConfig {
    database_url: String,
    interval_seconds: u64,
}

impl SweepConfig {
    fn load() -> AppResult<Self> {
        let database_url = required_env("DATABASE_URL")?;
        let interval_seconds = match env::var("SWEEP_INTERVAL_SECONDS") {
            Ok(value) => value.parse::<u64>().map_err(|error| {
                AppError::Validation(format!(
                    "invalid SWEEP_INTERVAL_SECONDS value '{value}': {error}"
                ))
            })?,
            Err(_) => 300,
        };

        if interval_seconds == 0 {
            return Err(AppError::Validation(
                "SWEEP_INTERVAL_SECONDS must be greater than zero".to_owned(),
            ));
        }

        Ok(Self {
            database_url,
            interval_seconds,
        })
    }
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = SweepConfig::load()?;
    let pool = connect_pool(config.database_url.as_str()).await?;
    let api_key_repository = PostgresApiKeyRepository::new(pool);

    info!(
        interval_seconds = config.interval_seconds,
        "keyfort-worker started"
    );

    let mut ticker = tokio::time::interval(Duration::from_secs(config.interval_seconds));

    loop {
        ticker.tick().await;

        match api_key_repository.lifecycle_totals().await {
            Ok((active, expired, revoked)) => {
                info!(active, expired, revoked, "api key lifecycle sweep");
            }
            Err(error) => {
                warn!(error = %error, "api key lifecycle sweep failed");
            }
        }
    }
}

async fn connect_pool(database_url: &str) -> AppResult<PgPool> {
    PgPoolOptions::new()
        .max_connections(2)
        .connect(database_url)
        .await
        .map_err(|error| {
            AppError::StoreUnavailable(format!("failed to connect to database: {error}"))
        })
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn required_env(name: &str) -> AppResult<String> {
    env::var(name).map_err(|_| AppError::Validation(format!("{name} is required")))
}
