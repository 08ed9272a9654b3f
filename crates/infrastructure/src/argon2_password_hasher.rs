//! Argon2id password hasher implementation.

use argon2::password_hash::SaltString;
use argon2::{Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version};
use keyfort_application::PasswordHasher as PasswordHasherPort;
use keyfort_core::{AppError, AppResult};

/// Argon2id password hasher with OWASP-recommended parameters
/// (m=19456 KiB, t=2, p=1).
#[derive(Clone)]
pub struct Argon2PasswordHasher {
    argon2: Argon2<'static>,
}

impl Argon2PasswordHasher {
    /// Creates a new Argon2id hasher.
    #[must_use]
    pub fn new() -> Self {
        let params = Params::new(19456, 2, 1, None).unwrap_or_else(|_| Params::default());
        Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        }
    }
}

impl Default for Argon2PasswordHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl PasswordHasherPort for Argon2PasswordHasher {
    fn hash_password(&self, password: &str) -> AppResult<String> {
        let salt = SaltString::generate(&mut argon2::password_hash::rand_core::OsRng);

        self.argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|error| AppError::Internal(format!("failed to hash password: {error}")))
    }

    fn verify_password(&self, password: &str, hash: &str) -> AppResult<bool> {
        let parsed_hash = PasswordHash::new(hash).map_err(|error| {
            AppError::Internal(format!("failed to parse password hash: {error}"))
        })?;

        match self
            .argon2
            .verify_password(password.as_bytes(), &parsed_hash)
        {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(error) => Err(AppError::Internal(format!(
                "password verification failed: {error}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_accepts_the_original_password() -> AppResult<()> {
        let hasher = Argon2PasswordHasher::new();
        let hash = hasher.hash_password("correct horse battery staple")?;
        assert!(hasher.verify_password("correct horse battery staple", &hash)?);
        Ok(())
    }

    #[test]
    fn mismatched_password_verifies_false_not_error() -> AppResult<()> {
        let hasher = Argon2PasswordHasher::new();
        let hash = hasher.hash_password("correct horse battery staple")?;
        assert!(!hasher.verify_password("incorrect horse", &hash)?);
        Ok(())
    }

    #[test]
    fn hashes_are_salted() -> AppResult<()> {
        let hasher = Argon2PasswordHasher::new();
        let first = hasher.hash_password("same-password-123")?;
        let second = hasher.hash_password("same-password-123")?;
        assert_ne!(first, second);
        Ok(())
    }
}
