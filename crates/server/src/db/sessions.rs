//! Admin session repository.
//!
//! Sessions are addressed by the hex SHA-256 of their bearer token. The raw
//! token only ever exists in the login response and the admin's browser.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use sqlx::PgPool;

use super::RepositoryError;
use crate::models::AdminSession;

/// Storage for admin sessions.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Persist a newly issued session.
    async fn insert(&self, session: &AdminSession) -> Result<(), RepositoryError>;

    /// Look up a session by token hash, whatever its state.
    async fn get(&self, token_hash: &str) -> Result<Option<AdminSession>, RepositoryError>;

    /// Mark one session revoked. Unknown hashes are ignored.
    async fn revoke(&self, token_hash: &str) -> Result<(), RepositoryError>;

    /// Revoke every session except `keep_hash`. Returns how many were revoked.
    async fn revoke_all_except(&self, keep_hash: &str) -> Result<u64, RepositoryError>;

    /// Revoke every session. Returns how many were revoked.
    async fn revoke_all(&self) -> Result<u64, RepositoryError>;

    /// Delete sessions that are revoked or expired as of `now`.
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, RepositoryError>;
}

// =============================================================================
// PostgreSQL
// =============================================================================

/// Sessions stored in the `admin_session` table.
#[derive(Clone)]
pub struct PgSessionRepository {
    pool: PgPool,
}

impl PgSessionRepository {
    /// Create a new session repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionRepository for PgSessionRepository {
    async fn insert(&self, session: &AdminSession) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO admin_session (token_hash, created_at, expires_at, revoked)
            VALUES ($1, $2, $3, $4)
            ",
        )
        .bind(&session.token_hash)
        .bind(session.created_at)
        .bind(session.expires_at)
        .bind(session.revoked)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, token_hash: &str) -> Result<Option<AdminSession>, RepositoryError> {
        let row: Option<(String, DateTime<Utc>, DateTime<Utc>, bool)> = sqlx::query_as(
            r"
            SELECT token_hash, created_at, expires_at, revoked
            FROM admin_session
            WHERE token_hash = $1
            ",
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?;

        Ok(
            row.map(|(token_hash, created_at, expires_at, revoked)| AdminSession {
                token_hash,
                created_at,
                expires_at,
                revoked,
            }),
        )
    }

    async fn revoke(&self, token_hash: &str) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE admin_session SET revoked = TRUE WHERE token_hash = $1")
            .bind(token_hash)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn revoke_all_except(&self, keep_hash: &str) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            "UPDATE admin_session SET revoked = TRUE WHERE token_hash <> $1 AND NOT revoked",
        )
        .bind(keep_hash)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn revoke_all(&self) -> Result<u64, RepositoryError> {
        let result = sqlx::query("UPDATE admin_session SET revoked = TRUE WHERE NOT revoked")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM admin_session WHERE revoked OR expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

// =============================================================================
// In-memory
// =============================================================================

/// Sessions held in a concurrent map. Each operation locks only the shard it
/// touches.
#[derive(Debug, Default)]
pub struct InMemorySessionRepository {
    sessions: DashMap<String, AdminSession>,
}

impl InMemorySessionRepository {
    /// Create an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn revoke_where(&self, keep: impl Fn(&str) -> bool) -> u64 {
        let mut count = 0;
        for mut entry in self.sessions.iter_mut() {
            if !entry.revoked && !keep(entry.key()) {
                entry.revoked = true;
                count += 1;
            }
        }
        count
    }
}

#[async_trait]
impl SessionRepository for InMemorySessionRepository {
    async fn insert(&self, session: &AdminSession) -> Result<(), RepositoryError> {
        self.sessions
            .insert(session.token_hash.clone(), session.clone());
        Ok(())
    }

    async fn get(&self, token_hash: &str) -> Result<Option<AdminSession>, RepositoryError> {
        Ok(self.sessions.get(token_hash).map(|s| s.value().clone()))
    }

    async fn revoke(&self, token_hash: &str) -> Result<(), RepositoryError> {
        if let Some(mut session) = self.sessions.get_mut(token_hash) {
            session.revoked = true;
        }
        Ok(())
    }

    async fn revoke_all_except(&self, keep_hash: &str) -> Result<u64, RepositoryError> {
        Ok(self.revoke_where(|hash| hash == keep_hash))
    }

    async fn revoke_all(&self) -> Result<u64, RepositoryError> {
        Ok(self.revoke_where(|_| false))
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, RepositoryError> {
        let before = self.sessions.len();
        self.sessions.retain(|_, session| session.is_valid_at(now));
        let purged = before.saturating_sub(self.sessions.len());
        Ok(u64::try_from(purged).unwrap_or(u64::MAX))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn session(hash: &str, now: DateTime<Utc>) -> AdminSession {
        AdminSession {
            token_hash: hash.to_string(),
            created_at: now,
            expires_at: now + Duration::hours(24),
            revoked: false,
        }
    }

    #[tokio::test]
    async fn test_revoke_all_except_keeps_one() {
        let repo = InMemorySessionRepository::new();
        let now = Utc::now();
        for hash in ["a", "b", "c"] {
            repo.insert(&session(hash, now)).await.unwrap();
        }

        let revoked = repo.revoke_all_except("b").await.unwrap();
        assert_eq!(revoked, 2);
        assert!(repo.get("a").await.unwrap().unwrap().revoked);
        assert!(!repo.get("b").await.unwrap().unwrap().revoked);
        assert!(repo.get("c").await.unwrap().unwrap().revoked);
    }

    #[tokio::test]
    async fn test_purge_removes_revoked_and_expired() {
        let repo = InMemorySessionRepository::new();
        let now = Utc::now();
        repo.insert(&session("live", now)).await.unwrap();
        repo.insert(&session("dead", now)).await.unwrap();
        repo.insert(&AdminSession {
            expires_at: now - Duration::seconds(1),
            ..session("stale", now)
        })
        .await
        .unwrap();
        repo.revoke("dead").await.unwrap();

        let purged = repo.purge_expired(now).await.unwrap();
        assert_eq!(purged, 2);
        assert!(repo.get("live").await.unwrap().is_some());
        assert!(repo.get("dead").await.unwrap().is_none());
        assert!(repo.get("stale").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_revoke_unknown_is_noop() {
        let repo = InMemorySessionRepository::new();
        repo.revoke("missing").await.unwrap();
        assert_eq!(repo.revoke_all().await.unwrap(), 0);
    }
}
