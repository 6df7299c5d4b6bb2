//! Admin credential repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tokio::sync::RwLock;

use super::RepositoryError;
use crate::models::AdminCredential;

/// Storage for the single admin credential.
#[async_trait]
pub trait CredentialRepository: Send + Sync {
    /// The stored credential, or `None` if no password has been set yet.
    async fn load(&self) -> Result<Option<AdminCredential>, RepositoryError>;

    /// Replace the stored credential.
    async fn store(&self, credential: &AdminCredential) -> Result<(), RepositoryError>;
}

/// Credential stored in the `admin_credential` singleton row.
#[derive(Clone)]
pub struct PgCredentialRepository {
    pool: PgPool,
}

impl PgCredentialRepository {
    /// Create a new credential repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CredentialRepository for PgCredentialRepository {
    async fn load(&self) -> Result<Option<AdminCredential>, RepositoryError> {
        let row: Option<(String, DateTime<Utc>)> =
            sqlx::query_as("SELECT password_hash, updated_at FROM admin_credential WHERE id = 1")
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(|(password_hash, updated_at)| AdminCredential {
            password_hash,
            updated_at,
        }))
    }

    async fn store(&self, credential: &AdminCredential) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO admin_credential (id, password_hash, updated_at)
            VALUES (1, $1, $2)
            ON CONFLICT (id) DO UPDATE
            SET password_hash = EXCLUDED.password_hash,
                updated_at = EXCLUDED.updated_at
            ",
        )
        .bind(&credential.password_hash)
        .bind(credential.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// Credential held in process memory.
#[derive(Debug, Default)]
pub struct InMemoryCredentialRepository {
    credential: RwLock<Option<AdminCredential>>,
}

impl InMemoryCredentialRepository {
    /// Create an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialRepository for InMemoryCredentialRepository {
    async fn load(&self) -> Result<Option<AdminCredential>, RepositoryError> {
        Ok(self.credential.read().await.clone())
    }

    async fn store(&self, credential: &AdminCredential) -> Result<(), RepositoryError> {
        *self.credential.write().await = Some(credential.clone());
        Ok(())
    }
}
