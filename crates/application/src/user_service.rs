//! Identity store ports and application service.
//!
//! Owns registration and email/password authentication. Login failures are
//! generic (`InvalidCredentials` for unknown email and wrong password
//! alike), and the hasher runs even on the unknown-email path so both
//! failures cost the same.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use keyfort_core::{AppError, AppResult};
use keyfort_domain::{EmailAddress, UserId, validate_password};

/// Identity record returned by repository queries.
#[derive(Debug, Clone)]
pub struct UserRecord {
    /// Unique identity identifier.
    pub id: UserId,
    /// Canonical email address.
    pub email: String,
    /// Argon2id password hash.
    pub password_hash: String,
    /// When the identity was created.
    pub created_at: DateTime<Utc>,
}

/// Repository port for identity persistence.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Finds an identity by canonical email.
    async fn find_by_email(&self, email: &str) -> AppResult<Option<UserRecord>>;

    /// Finds an identity by its unique identifier.
    async fn find_by_id(&self, user_id: UserId) -> AppResult<Option<UserRecord>>;

    /// Creates a new identity record.
    ///
    /// Fails with `Conflict` when the email is already registered; the
    /// store's unique constraint is the authority, not a prior read.
    async fn create(&self, email: &str, password_hash: &str) -> AppResult<UserRecord>;
}

/// Port for password hashing operations. Keeps the application layer free
/// of direct cryptographic library coupling.
pub trait PasswordHasher: Send + Sync {
    /// Hashes a plaintext password.
    fn hash_password(&self, password: &str) -> AppResult<String>;

    /// Verifies a plaintext password against a stored hash.
    fn verify_password(&self, password: &str, hash: &str) -> AppResult<bool>;
}

/// Application service for registration and login.
#[derive(Clone)]
pub struct UserService {
    user_repository: Arc<dyn UserRepository>,
    password_hasher: Arc<dyn PasswordHasher>,
}

impl UserService {
    /// Creates a new user service.
    #[must_use]
    pub fn new(
        user_repository: Arc<dyn UserRepository>,
        password_hasher: Arc<dyn PasswordHasher>,
    ) -> Self {
        Self {
            user_repository,
            password_hasher,
        }
    }

    /// Registers a new identity with email and password.
    ///
    /// Fails with `Conflict` when the email is already registered.
    pub async fn register(&self, email: &str, password: &str) -> AppResult<UserRecord> {
        let email_address = EmailAddress::new(email)?;
        validate_password(password)?;

        let password_hash = self.password_hasher.hash_password(password)?;
        self.user_repository
            .create(email_address.as_str(), &password_hash)
            .await
    }

    /// Authenticates an email/password pair and returns the identity.
    pub async fn login(&self, email: &str, password: &str) -> AppResult<UserRecord> {
        let canonical = EmailAddress::new(email).ok();

        let user = match canonical {
            Some(ref email_address) => {
                self.user_repository
                    .find_by_email(email_address.as_str())
                    .await?
            }
            None => None,
        };

        let Some(user) = user else {
            // Hash anyway so an unknown email costs the same as a wrong password.
            let _ = self.password_hasher.hash_password(password);
            return Err(AppError::InvalidCredentials);
        };

        let password_valid = self
            .password_hasher
            .verify_password(password, &user.password_hash)?;

        if !password_valid {
            return Err(AppError::InvalidCredentials);
        }

        Ok(user)
    }

    /// Returns an identity record by id, if it exists.
    pub async fn find_by_id(&self, user_id: UserId) -> AppResult<Option<UserRecord>> {
        self.user_repository.find_by_id(user_id).await
    }
}
