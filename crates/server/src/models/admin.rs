//! Admin credential and session records.

use chrono::{DateTime, Utc};

/// The stored admin password.
///
/// There is exactly one admin. Rotating the password replaces this record.
#[derive(Clone, PartialEq, Eq)]
pub struct AdminCredential {
    /// Argon2id PHC string. Never the plaintext.
    pub password_hash: String,
    pub updated_at: DateTime<Utc>,
}

impl std::fmt::Debug for AdminCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminCredential")
            .field("password_hash", &"[REDACTED]")
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

/// A persisted admin session.
///
/// Only the SHA-256 digest of the bearer token is kept, so a leaked session
/// table cannot be replayed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminSession {
    /// Lowercase hex SHA-256 of the raw token.
    pub token_hash: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub revoked: bool,
}

impl AdminSession {
    /// A session is usable iff it has not been revoked and has not expired.
    #[must_use]
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        !self.revoked && now < self.expires_at
    }
}
