use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use keyfort_core::{AppError, AppResult};
use keyfort_domain::API_KEY_PREFIX;

/// Generates a fresh API key secret and its storage digest.
///
/// Returns `(raw_secret, sha256_hex)`. The raw secret is the literal
/// prefix followed by 32 random bytes in URL-safe base64.
pub(super) fn generate_api_key_secret() -> AppResult<(String, String)> {
    let mut bytes = [0u8; 32];
    getrandom::fill(&mut bytes)
        .map_err(|error| AppError::Internal(format!("failed to generate key secret: {error}")))?;

    let raw_secret = format!("{API_KEY_PREFIX}{}", URL_SAFE_NO_PAD.encode(bytes));
    let digest = hash_secret(&raw_secret);
    Ok((raw_secret, digest))
}

/// Computes the SHA-256 hex digest of a secret value for storage.
pub(super) fn hash_secret(raw_secret: &str) -> String {
    use sha2::{Digest, Sha256};
    use std::fmt::Write;

    let mut hasher = Sha256::new();
    hasher.update(raw_secret.as_bytes());
    let result = hasher.finalize();

    result
        .iter()
        .fold(String::with_capacity(64), |mut acc, byte| {
            let _ = write!(acc, "{byte:02x}");
            acc
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secrets_carry_the_literal_prefix() -> AppResult<()> {
        let (secret, _) = generate_api_key_secret()?;
        assert!(secret.starts_with(API_KEY_PREFIX));
        Ok(())
    }

    #[test]
    fn digest_matches_rehashing_the_secret() -> AppResult<()> {
        let (secret, digest) = generate_api_key_secret()?;
        assert_eq!(hash_secret(&secret), digest);
        assert_eq!(digest.len(), 64);
        Ok(())
    }

    #[test]
    fn consecutive_secrets_differ() -> AppResult<()> {
        let (first, _) = generate_api_key_secret()?;
        let (second, _) = generate_api_key_secret()?;
        assert_ne!(first, second);
        Ok(())
    }
}
