//! Persistent stores for the site document and the admin account.
//!
//! # Database
//!
//! ## Tables
//!
//! - `site_document` - The site content document as one JSONB row per id
//! - `admin_credential` - The single admin password hash
//! - `admin_session` - Admin sessions keyed by SHA-256 of the bearer token
//!
//! Every store is a trait with a `PostgreSQL` implementation and an in-memory
//! one. The in-memory stores back tests and single-process development runs.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/` and run via:
//! ```bash
//! cargo run -p gfx-studio-cli -- migrate
//! ```

pub mod credentials;
pub mod sessions;
pub mod site;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use credentials::{CredentialRepository, InMemoryCredentialRepository, PgCredentialRepository};
pub use sessions::{InMemorySessionRepository, PgSessionRepository, SessionRepository};
pub use site::{InMemorySiteRepository, PgSiteRepository, SiteRepository};

/// Migrations embedded from `crates/server/migrations/`.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A document could not be converted to or from JSON.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
