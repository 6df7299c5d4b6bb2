//! Database migration command.
//!
//! Migrations live in `crates/server/migrations/` and are embedded into the
//! server library at compile time.

use gfx_studio_server::db::MIGRATOR;

use super::{CommandError, connect};

/// Apply every pending migration.
pub async fn run() -> Result<(), CommandError> {
    let pool = connect().await?;

    tracing::info!("Running migrations...");
    MIGRATOR.run(&pool).await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
