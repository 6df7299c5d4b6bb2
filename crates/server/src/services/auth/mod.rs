//! Admin authentication service.
//!
//! The site has a single admin who logs in with a password. A successful
//! login yields a 24 hour bearer token. Repeated failures from the same
//! client lock that client out for a while.
//!
//! - [`PasswordStore`] - Argon2 hash of the admin password
//! - [`SessionStore`] - Bearer token sessions
//! - [`LockoutGuard`] - Per-client failure counters
//! - [`AdminAuth`] - The login, logout and password-change flows over all three

mod error;
pub mod lockout;
pub mod password;
pub mod session;

use chrono::Utc;

pub use error::AuthError;
pub use lockout::LockoutGuard;
pub use password::{MIN_PASSWORD_LENGTH, PasswordStore};
pub use session::{IssuedSession, SessionStore, hash_token};

use crate::models::AdminSession;

/// Admin authentication flows.
pub struct AdminAuth {
    passwords: PasswordStore,
    sessions: SessionStore,
    lockout: LockoutGuard,
}

impl AdminAuth {
    /// Create the service from its three stores.
    #[must_use]
    pub const fn new(passwords: PasswordStore, sessions: SessionStore, lockout: LockoutGuard) -> Self {
        Self {
            passwords,
            sessions,
            lockout,
        }
    }

    /// Get a reference to the password store.
    #[must_use]
    pub const fn passwords(&self) -> &PasswordStore {
        &self.passwords
    }

    /// Get a reference to the session store.
    #[must_use]
    pub const fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Log in with the admin password from client `identity`.
    ///
    /// The attempt is reserved with the lockout guard before the password is
    /// hashed, so a locked-out client costs no Argon2 work and parallel
    /// guesses cannot exceed the threshold.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Locked` while `identity` is locked out.
    /// Returns `AuthError::InvalidCredentials` for a wrong password.
    pub async fn login(&self, identity: &str, password: &str) -> Result<IssuedSession, AuthError> {
        self.check_password(identity, password, "admin login failed")
            .await?;

        let issued = self.sessions.issue().await?;
        tracing::info!(identity = %identity, expires_at = %issued.expires_at, "admin logged in");
        Ok(issued)
    }

    /// Check a bearer token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidSession` if the token is not usable.
    pub async fn authorize(&self, token: &str) -> Result<AdminSession, AuthError> {
        self.sessions.validate(token).await
    }

    /// Revoke the session for `token`. Unknown tokens are accepted silently.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Repository` if the session store is unavailable.
    pub async fn logout(&self, token: &str) -> Result<(), AuthError> {
        self.sessions.revoke(token).await
    }

    /// Change the admin password.
    ///
    /// Requires a valid session and the current password. Every other session
    /// is revoked afterwards; the caller's session stays valid.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidSession` if `token` is not usable.
    /// Returns `AuthError::Locked` while `identity` is locked out.
    /// Returns `AuthError::InvalidCredentials` if `current_password` is wrong.
    /// Returns `AuthError::WeakPassword` if `new_password` is too short.
    pub async fn change_password(
        &self,
        identity: &str,
        token: &str,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        self.sessions.validate(token).await?;
        self.check_password(
            identity,
            current_password,
            "password change with wrong current password",
        )
        .await?;

        self.passwords.rotate(new_password).await?;
        let revoked = self.sessions.revoke_all_except(token).await?;
        tracing::info!(revoked, "admin password changed, other sessions revoked");
        Ok(())
    }

    /// Drop expired sessions and stale lockout counters.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Repository` if the session store is unavailable.
    pub async fn purge_expired(&self) -> Result<(), AuthError> {
        let now = Utc::now();
        let sessions = self.sessions.purge_expired(now).await?;
        let counters = self.lockout.purge_stale_at(now);
        tracing::debug!(sessions, counters, "purged expired admin auth state");
        Ok(())
    }

    async fn check_password(
        &self,
        identity: &str,
        candidate: &str,
        failure_message: &'static str,
    ) -> Result<(), AuthError> {
        let attempt = self.lockout.reserve(identity).map_err(|retry_after| {
            tracing::warn!(identity = %identity, ?retry_after, "admin password check refused: locked out");
            AuthError::Locked { retry_after }
        })?;

        // A store error drops `attempt` unsettled, which releases it.
        if self.passwords.verify(candidate).await? {
            attempt.succeeded();
            Ok(())
        } else {
            let failures = attempt.failed();
            tracing::warn!(identity = %identity, failures, "{failure_message}");
            Err(AuthError::InvalidCredentials)
        }
    }
}
