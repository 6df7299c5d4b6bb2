//! Admin credential management commands.
//!
//! The password is read from stdin so it never appears in shell history or
//! the process list.

use std::io::BufRead;
use std::sync::Arc;

use gfx_studio_server::db::{PgCredentialRepository, PgSessionRepository};
use gfx_studio_server::services::auth::{PasswordStore, SessionStore, password::validate_password};

use super::{CommandError, connect};

/// Read the new password from the first line of `input`.
///
/// Only the line terminator is stripped; surrounding spaces are part of the
/// password.
pub fn read_password(mut input: impl BufRead) -> Result<String, CommandError> {
    let mut line = String::new();
    input.read_line(&mut line)?;
    let password = line.trim_end_matches(['\r', '\n']).to_string();
    validate_password(&password)?;
    Ok(password)
}

/// Replace the admin password and revoke every admin session.
pub async fn set_password(password: &str) -> Result<(), CommandError> {
    let pool = connect().await?;

    let passwords = PasswordStore::new(Arc::new(PgCredentialRepository::new(pool.clone())));
    let credential = passwords.rotate(password).await?;
    tracing::info!(updated_at = %credential.updated_at, "Admin password updated");

    revoke_all(SessionStore::new(Arc::new(PgSessionRepository::new(pool)))).await?;
    Ok(())
}

/// Revoke every admin session. Returns how many were revoked.
pub async fn revoke_sessions() -> Result<u64, CommandError> {
    let pool = connect().await?;
    revoke_all(SessionStore::new(Arc::new(PgSessionRepository::new(pool)))).await
}

async fn revoke_all(sessions: SessionStore) -> Result<u64, CommandError> {
    let revoked = sessions.revoke_all().await?;
    tracing::info!(revoked, "Admin sessions revoked");
    Ok(revoked)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_read_password_strips_newline_only() {
        let password = read_password(" a long password \r\nignored\n".as_bytes()).unwrap();
        assert_eq!(password, " a long password ");
    }

    #[test]
    fn test_read_password_rejects_short() {
        let err = read_password("short\n".as_bytes()).unwrap_err();
        assert!(matches!(err, CommandError::Auth(_)));
    }
}
