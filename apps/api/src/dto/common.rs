use serde::{Deserialize, Serialize};

/// Generic confirmation payload.
#[derive(Debug, Serialize)]
pub struct GenericMessageResponse {
    pub message: String,
}

/// Liveness payload.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Pagination query parameters shared by list endpoints.
#[derive(Debug, Deserialize)]
pub struct PageQuery {
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    100
}
