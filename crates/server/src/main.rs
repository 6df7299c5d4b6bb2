//! GFX Studio server - Reviews, admin panel and Discord login API.
//!
//! # Architecture
//!
//! - Axum web framework serving JSON endpoints
//! - `PostgreSQL` JSONB document for site content
//! - Discord OAuth for visitor login, signed cookie sessions
//! - Argon2 admin password with bearer-token sessions and lockout
//! - Discord webhooks for review and login alerts
//!
//! Migrations are NOT run automatically on startup.
//! Run them explicitly via: `gfx-studio migrate`

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use gfx_studio_server::config::{LogFormat, StudioConfig};
use gfx_studio_server::db;
use gfx_studio_server::services::notify::DiscordWebhookSink;
use gfx_studio_server::state::{AppState, Stores, build_http_client};
use secrecy::ExposeSecret;
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{Layer, layer::SubscriberExt, util::SubscriberInitExt};

/// How often expired sessions and stale lockout counters are dropped.
const PURGE_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &StudioConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        tracing::Level::TRACE => sentry_tracing::EventFilter::Ignore,
    }
}

fn init_tracing(format: LogFormat) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "gfx_studio_server=info,tower_http=debug".into());

    let fmt_layer = match format {
        LogFormat::Pretty => tracing_subscriber::fmt::layer().boxed(),
        LogFormat::Json => tracing_subscriber::fmt::layer().json().boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();
}

#[tokio::main]
async fn main() {
    // Load configuration from environment (needed for Sentry init)
    let config = StudioConfig::from_env().expect("Failed to load configuration");

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = init_sentry(&config);
    init_tracing(config.log_format);

    let site_defaults = config
        .site_defaults()
        .expect("Failed to load default site document");

    let pool = db::create_pool(&config.database_url)
        .await
        .expect("Failed to create database pool");
    tracing::info!("Database pool created");

    let http = build_http_client(&config).expect("Failed to build HTTP client");
    let sink = Arc::new(DiscordWebhookSink::new(http.clone(), config.webhooks.clone()));
    let stores = Stores::postgres(&pool, site_defaults);
    let state = AppState::new(config.clone(), stores, http, sink);

    if let Some(password) = &config.admin_bootstrap_password {
        match state
            .auth()
            .passwords()
            .bootstrap(password.expose_secret())
            .await
        {
            Ok(true) => tracing::info!("Admin password bootstrapped from environment"),
            Ok(false) => tracing::debug!("Admin password already set, ignoring bootstrap value"),
            Err(e) => tracing::error!(error = %e, "Failed to bootstrap admin password"),
        }
    }

    spawn_purge_task(state.clone());

    let app = gfx_studio_server::app(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction());

    let addr = config.socket_addr();
    tracing::info!("gfx-studio-server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .expect("Server error");
}

/// Periodically drop expired admin sessions and stale lockout counters.
fn spawn_purge_task(state: AppState) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(PURGE_INTERVAL);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            if let Err(e) = state.auth().purge_expired().await {
                tracing::warn!(error = %e, "Failed to purge expired admin sessions");
            }
        }
    });
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
