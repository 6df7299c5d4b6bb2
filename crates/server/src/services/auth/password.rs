//! Admin password store.

use std::sync::Arc;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::Utc;

use super::AuthError;
use crate::db::CredentialRepository;
use crate::models::AdminCredential;

/// Minimum admin password length, in characters.
pub const MIN_PASSWORD_LENGTH: usize = 12;

/// Verifies and rotates the admin password.
///
/// Hashing runs on the blocking pool so a login never stalls the async
/// runtime.
#[derive(Clone)]
pub struct PasswordStore {
    credentials: Arc<dyn CredentialRepository>,
}

impl PasswordStore {
    /// Create a password store over a credential repository.
    #[must_use]
    pub fn new(credentials: Arc<dyn CredentialRepository>) -> Self {
        Self { credentials }
    }

    /// Check a candidate password against the stored hash.
    ///
    /// Returns `false` when no credential has been set.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Repository` if the credential cannot be loaded.
    pub async fn verify(&self, candidate: &str) -> Result<bool, AuthError> {
        let Some(credential) = self.credentials.load().await? else {
            tracing::warn!("admin login attempted but no admin password is configured");
            return Ok(false);
        };

        let candidate = candidate.to_owned();
        let hash = credential.password_hash;
        tokio::task::spawn_blocking(move || verify_password(&candidate, &hash).is_ok())
            .await
            .map_err(|_| AuthError::PasswordHash)
    }

    /// Replace the admin password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::WeakPassword` if the password is too short.
    /// Returns `AuthError::Repository` if the credential cannot be stored.
    pub async fn rotate(&self, new_password: &str) -> Result<AdminCredential, AuthError> {
        validate_password(new_password)?;

        let owned = new_password.to_owned();
        let password_hash = tokio::task::spawn_blocking(move || hash_password(&owned))
            .await
            .map_err(|_| AuthError::PasswordHash)??;

        let credential = AdminCredential {
            password_hash,
            updated_at: Utc::now(),
        };
        self.credentials.store(&credential).await?;

        tracing::info!("admin password rotated");
        Ok(credential)
    }

    /// Whether an admin password has been set.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Repository` if the credential cannot be loaded.
    pub async fn is_configured(&self) -> Result<bool, AuthError> {
        Ok(self.credentials.load().await?.is_some())
    }

    /// Store `password` only if no credential exists yet.
    ///
    /// Returns whether a credential was written.
    ///
    /// # Errors
    ///
    /// Same as [`PasswordStore::rotate`].
    pub async fn bootstrap(&self, password: &str) -> Result<bool, AuthError> {
        if self.is_configured().await? {
            return Ok(false);
        }
        self.rotate(password).await?;
        Ok(true)
    }
}

/// Reject passwords below the minimum length.
///
/// # Errors
///
/// Returns `AuthError::WeakPassword` describing the requirement.
pub fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Hash a password with Argon2id and a random salt.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}
