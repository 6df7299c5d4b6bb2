//! Authentication error types.

use std::time::Duration;

use thiserror::Error;

use crate::db::RepositoryError;

/// Errors that can occur during admin authentication.
///
/// Every "you are not allowed" case (wrong password, unknown, expired or
/// revoked session) is reported to clients identically.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Wrong password, or no password has been configured.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Session token missing, unknown, expired or revoked.
    #[error("invalid session")]
    InvalidSession,

    /// Too many failed attempts from this client.
    #[error("locked out, retry after {retry_after:?}")]
    Locked {
        /// Time until the lockout window ends.
        retry_after: Duration,
    },

    /// New password does not meet requirements.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}
