//! GFX Studio CLI - Database migrations and admin credential management.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! gfx-studio migrate
//!
//! # Set the admin password (read from stdin)
//! echo 'a long new password' | gfx-studio admin set-password
//!
//! # Log out every admin session
//! gfx-studio admin revoke-sessions
//! ```
//!
//! # Environment Variables
//!
//! - `STUDIO_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "gfx-studio")]
#[command(author, version, about = "GFX Studio CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage the admin credential and sessions
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Replace the admin password with one read from stdin.
    ///
    /// Every admin session is revoked afterwards.
    SetPassword,
    /// Revoke every admin session
    RevokeSessions,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CommandError> {
    dotenvy::dotenv().ok();

    match cli.command {
        Commands::Migrate => commands::migrate::run().await,
        Commands::Admin { action } => match action {
            AdminAction::SetPassword => {
                let password = commands::admin::read_password(std::io::stdin().lock())?;
                commands::admin::set_password(&password).await
            }
            AdminAction::RevokeSessions => commands::admin::revoke_sessions().await.map(|_| ()),
        },
    }
}
