//! Admin session issuance and validation.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use sha2::{Digest, Sha256};

use super::AuthError;
use crate::db::SessionRepository;
use crate::models::AdminSession;

/// How long an admin session stays valid.
pub const ADMIN_SESSION_TTL: Duration = Duration::hours(24);

/// Raw token length in bytes (256 bits).
const TOKEN_BYTES: usize = 32;

/// A freshly issued session. The only place the raw token exists server-side.
#[derive(Clone)]
pub struct IssuedSession {
    /// Hex-encoded bearer token handed to the admin.
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl std::fmt::Debug for IssuedSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssuedSession")
            .field("token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Issues, validates and revokes admin bearer tokens.
///
/// A session moves from active to invalid by expiry or revocation and never
/// back.
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<dyn SessionRepository>,
    ttl: Duration,
}

impl SessionStore {
    /// Create a session store with the standard 24 hour lifetime.
    #[must_use]
    pub fn new(sessions: Arc<dyn SessionRepository>) -> Self {
        Self::with_ttl(sessions, ADMIN_SESSION_TTL)
    }

    /// Create a session store with a custom lifetime.
    #[must_use]
    pub fn with_ttl(sessions: Arc<dyn SessionRepository>, ttl: Duration) -> Self {
        Self { sessions, ttl }
    }

    /// Issue a new session.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Repository` if the session cannot be stored.
    pub async fn issue(&self) -> Result<IssuedSession, AuthError> {
        self.issue_at(Utc::now()).await
    }

    /// Issue a new session as of `now`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Repository` if the session cannot be stored.
    pub async fn issue_at(&self, now: DateTime<Utc>) -> Result<IssuedSession, AuthError> {
        let token = generate_token();
        let session = AdminSession {
            token_hash: hash_token(&token),
            created_at: now,
            expires_at: now + self.ttl,
            revoked: false,
        };
        self.sessions.insert(&session).await?;

        Ok(IssuedSession {
            token,
            expires_at: session.expires_at,
        })
    }

    /// Resolve a token to its session.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidSession` for unknown, expired and revoked
    /// tokens alike.
    pub async fn validate(&self, token: &str) -> Result<AdminSession, AuthError> {
        self.validate_at(token, Utc::now()).await
    }

    /// Resolve a token to its session as of `now`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidSession` for unknown, expired and revoked
    /// tokens alike.
    pub async fn validate_at(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<AdminSession, AuthError> {
        if token.is_empty() {
            return Err(AuthError::InvalidSession);
        }

        self.sessions
            .get(&hash_token(token))
            .await?
            .filter(|session| session.is_valid_at(now))
            .ok_or(AuthError::InvalidSession)
    }

    /// Revoke one session. Revoking an unknown token is not an error.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Repository` if the store is unavailable.
    pub async fn revoke(&self, token: &str) -> Result<(), AuthError> {
        self.sessions.revoke(&hash_token(token)).await?;
        Ok(())
    }

    /// Revoke every session other than the one for `token`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Repository` if the store is unavailable.
    pub async fn revoke_all_except(&self, token: &str) -> Result<u64, AuthError> {
        Ok(self.sessions.revoke_all_except(&hash_token(token)).await?)
    }

    /// Revoke every session.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Repository` if the store is unavailable.
    pub async fn revoke_all(&self) -> Result<u64, AuthError> {
        Ok(self.sessions.revoke_all().await?)
    }

    /// Drop sessions that can never become valid again.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Repository` if the store is unavailable.
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, AuthError> {
        Ok(self.sessions.purge_expired(now).await?)
    }
}

/// Generate a random 256-bit token, hex encoded.
fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Hash a token for storage (raw tokens are never persisted).
#[must_use]
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::InMemorySessionRepository;

    fn store() -> SessionStore {
        SessionStore::new(Arc::new(InMemorySessionRepository::new()))
    }

    #[tokio::test]
    async fn test_issued_token_is_valid() {
        let store = store();
        let issued = store.issue().await.unwrap();
        assert_eq!(issued.token.len(), TOKEN_BYTES * 2);
        assert!(store.validate(&issued.token).await.is_ok());
    }

    #[tokio::test]
    async fn test_revoked_token_is_invalid() {
        let store = store();
        let issued = store.issue().await.unwrap();
        store.revoke(&issued.token).await.unwrap();
        assert!(matches!(
            store.validate(&issued.token).await,
            Err(AuthError::InvalidSession)
        ));
    }

    #[tokio::test]
    async fn test_token_invalid_at_expiry() {
        let store = store();
        let now = Utc::now();
        let issued = store.issue_at(now).await.unwrap();

        assert!(
            store
                .validate_at(&issued.token, now + Duration::hours(23))
                .await
                .is_ok()
        );
        assert!(
            store
                .validate_at(&issued.token, issued.expires_at)
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn test_unknown_and_empty_tokens_invalid() {
        let store = store();
        assert!(matches!(
            store.validate("deadbeef").await,
            Err(AuthError::InvalidSession)
        ));
        assert!(matches!(
            store.validate("").await,
            Err(AuthError::InvalidSession)
        ));
    }

    #[tokio::test]
    async fn test_revoke_all_except_keeps_current() {
        let store = store();
        let current = store.issue().await.unwrap();
        let other_a = store.issue().await.unwrap();
        let other_b = store.issue().await.unwrap();

        let revoked = store.revoke_all_except(&current.token).await.unwrap();
        assert_eq!(revoked, 2);
        assert!(store.validate(&current.token).await.is_ok());
        assert!(store.validate(&other_a.token).await.is_err());
        assert!(store.validate(&other_b.token).await.is_err());
    }

    #[tokio::test]
    async fn test_tokens_are_unique() {
        let store = store();
        let a = store.issue().await.unwrap();
        let b = store.issue().await.unwrap();
        assert_ne!(a.token, b.token);
    }

    #[test]
    fn test_hash_token_is_sha256_hex() {
        assert_eq!(
            hash_token("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
