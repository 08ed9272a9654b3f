//! HS256 session token codec backed by `jsonwebtoken`.

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};

use keyfort_application::{SESSION_TOKEN_TYPE, SessionClaims, SessionTokenCodec};
use keyfort_core::{AppError, AppResult};

/// Signs and verifies session tokens with a shared HS256 secret.
#[derive(Clone)]
pub struct JwtSessionCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtSessionCodec {
    /// Creates a codec from the shared signing secret.
    #[must_use]
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
        }
    }
}

impl std::fmt::Debug for JwtSessionCodec {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("JwtSessionCodec")
            .field("encoding_key", &"[REDACTED]")
            .field("decoding_key", &"[REDACTED]")
            .finish()
    }
}

impl SessionTokenCodec for JwtSessionCodec {
    fn encode(&self, claims: &SessionClaims) -> AppResult<String> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|error| AppError::Internal(format!("failed to sign session token: {error}")))
    }

    fn decode(&self, token: &str) -> AppResult<SessionClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        // Exact expiry semantics: a token is invalid the instant exp passes.
        validation.leeway = 0;

        let data = match decode::<SessionClaims>(token, &self.decoding_key, &validation) {
            Ok(data) => data,
            Err(error) => {
                return Err(match error.kind() {
                    ErrorKind::ExpiredSignature => AppError::CredentialExpired,
                    _ => AppError::CredentialMalformed(error.to_string()),
                });
            }
        };

        if data.claims.token_type != SESSION_TOKEN_TYPE {
            return Err(AppError::CredentialMalformed(format!(
                "unexpected token type '{}'",
                data.claims.token_type
            )));
        }

        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use keyfort_core::AppError;
    use uuid::Uuid;

    use super::*;

    fn claims(offset: Duration) -> SessionClaims {
        let now = Utc::now();
        SessionClaims {
            sub: Uuid::new_v4(),
            iat: now.timestamp(),
            exp: (now + offset).timestamp(),
            token_type: SESSION_TOKEN_TYPE.to_owned(),
        }
    }

    #[test]
    fn signed_token_round_trips() -> keyfort_core::AppResult<()> {
        let codec = JwtSessionCodec::new(b"a-32-byte-minimum-signing-secret");
        let original = claims(Duration::days(30));

        let token = codec.encode(&original)?;
        let decoded = codec.decode(&token)?;

        assert_eq!(decoded.sub, original.sub);
        assert_eq!(decoded.exp, original.exp);
        Ok(())
    }

    #[test]
    fn expired_token_is_reported_as_expired() -> keyfort_core::AppResult<()> {
        let codec = JwtSessionCodec::new(b"a-32-byte-minimum-signing-secret");
        let token = codec.encode(&claims(Duration::seconds(-10)))?;

        assert!(matches!(
            codec.decode(&token),
            Err(AppError::CredentialExpired)
        ));
        Ok(())
    }

    #[test]
    fn token_signed_with_another_secret_is_malformed() -> keyfort_core::AppResult<()> {
        let codec = JwtSessionCodec::new(b"a-32-byte-minimum-signing-secret");
        let other = JwtSessionCodec::new(b"a-different-32-byte-long-secret!");
        let token = other.encode(&claims(Duration::days(1)))?;

        assert!(matches!(
            codec.decode(&token),
            Err(AppError::CredentialMalformed(_))
        ));
        Ok(())
    }

    #[test]
    fn garbage_input_is_malformed() {
        let codec = JwtSessionCodec::new(b"a-32-byte-minimum-signing-secret");
        assert!(matches!(
            codec.decode("definitely.not.a-jwt"),
            Err(AppError::CredentialMalformed(_))
        ));
    }
}
