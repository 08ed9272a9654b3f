use chrono::{DateTime, Utc};
use keyfort_application::ApiKeyRecord;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Incoming payload for API key creation.
#[derive(Debug, Deserialize)]
pub struct CreateApiKeyRequest {
    pub name: String,
    #[serde(default = "default_expires_in_days")]
    pub expires_in_days: i64,
}

fn default_expires_in_days() -> i64 {
    90
}

/// Incoming payload for an expiry update.
#[derive(Debug, Deserialize)]
pub struct UpdateApiKeyRequest {
    pub expires_in_days: i64,
}

/// Freshly issued key. The only response that ever carries the secret.
#[derive(Debug, Serialize)]
pub struct ApiKeyCreatedResponse {
    pub id: Uuid,
    pub name: String,
    pub secret: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// One key in a listing; no secret, ever.
#[derive(Debug, Serialize)]
pub struct ApiKeyListItem {
    pub id: Uuid,
    pub name: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub revoked: bool,
    pub last_used_at: Option<DateTime<Utc>>,
}

impl From<ApiKeyRecord> for ApiKeyListItem {
    fn from(record: ApiKeyRecord) -> Self {
        Self {
            id: record.id.as_uuid(),
            name: record.name,
            expires_at: record.expires_at,
            created_at: record.issued_at,
            revoked: record.revoked,
            last_used_at: record.last_used_at,
        }
    }
}

/// Paged key listing.
#[derive(Debug, Serialize)]
pub struct ApiKeyListResponse {
    pub items: Vec<ApiKeyListItem>,
    pub total: i64,
    pub skip: i64,
    pub limit: i64,
}
