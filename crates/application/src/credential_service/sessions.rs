use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use keyfort_core::AppResult;
use keyfort_domain::UserId;

use super::CredentialService;

/// Claim discriminator embedded in every session token.
pub const SESSION_TOKEN_TYPE: &str = "session";

/// Claims embedded in a session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Owning identity id.
    pub sub: Uuid,
    /// Issued-at, seconds since epoch.
    pub iat: i64,
    /// Expiry, seconds since epoch.
    pub exp: i64,
    /// Discriminator, always [`SESSION_TOKEN_TYPE`].
    #[serde(rename = "type")]
    pub token_type: String,
}

/// Port for signing and verifying stateless session tokens.
pub trait SessionTokenCodec: Send + Sync {
    /// Signs claims into a compact token string.
    fn encode(&self, claims: &SessionClaims) -> AppResult<String>;

    /// Verifies a token and returns its claims.
    ///
    /// Fails with `CredentialExpired` once `exp` has passed and with
    /// `CredentialMalformed` for any parse, signature, or claim-shape
    /// failure.
    fn decode(&self, token: &str) -> AppResult<SessionClaims>;
}

/// Result of issuing a session token.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    /// The signed bearer value.
    pub token: String,
    /// Identity the session belongs to.
    pub user_id: UserId,
    /// When the session was issued.
    pub issued_at: DateTime<Utc>,
    /// When the session stops validating.
    pub expires_at: DateTime<Utc>,
}

impl CredentialService {
    /// Issues a session token for an authenticated identity.
    ///
    /// Sessions are not stored server-side; validity is bound to the
    /// signature and the embedded expiry alone, so there is nothing to
    /// revoke and nothing to sweep.
    pub fn issue_session(&self, user_id: UserId) -> AppResult<IssuedSession> {
        let issued_at = Utc::now();
        let expires_at = issued_at + self.session_ttl;

        let claims = SessionClaims {
            sub: user_id.as_uuid(),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
            token_type: SESSION_TOKEN_TYPE.to_owned(),
        };

        let token = self.session_codec.encode(&claims)?;

        Ok(IssuedSession {
            token,
            user_id,
            issued_at,
            expires_at,
        })
    }
}
