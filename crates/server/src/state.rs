//! Application state shared across handlers.

use std::sync::Arc;

use gfx_studio_core::{Denylist, SiteData};
use reqwest::Client;
use sqlx::PgPool;

use crate::config::StudioConfig;
use crate::db::{
    CredentialRepository, InMemoryCredentialRepository, InMemorySessionRepository,
    InMemorySiteRepository, PgCredentialRepository, PgSessionRepository, PgSiteRepository,
    SessionRepository, SiteRepository,
};
use crate::discord::DiscordClient;
use crate::services::auth::{AdminAuth, LockoutGuard, PasswordStore, SessionStore};
use crate::services::notify::{NotificationSink, Notifier};
use crate::services::visitor::VisitorTokens;

/// The persistent stores the server runs on.
#[derive(Clone)]
pub struct Stores {
    pub site: Arc<dyn SiteRepository>,
    pub credentials: Arc<dyn CredentialRepository>,
    pub sessions: Arc<dyn SessionRepository>,
}

impl Stores {
    /// `PostgreSQL`-backed stores.
    #[must_use]
    pub fn postgres(pool: &PgPool, site_defaults: SiteData) -> Self {
        Self {
            site: Arc::new(PgSiteRepository::new(pool.clone(), site_defaults)),
            credentials: Arc::new(PgCredentialRepository::new(pool.clone())),
            sessions: Arc::new(PgSessionRepository::new(pool.clone())),
        }
    }

    /// Process-local stores. Everything is lost on restart.
    #[must_use]
    pub fn in_memory(site_defaults: SiteData) -> Self {
        Self {
            site: Arc::new(InMemorySiteRepository::new(site_defaults)),
            credentials: Arc::new(InMemoryCredentialRepository::new()),
            sessions: Arc::new(InMemorySessionRepository::new()),
        }
    }
}

/// Build the HTTP client used for every outbound Discord call.
///
/// # Errors
///
/// Returns `reqwest::Error` if the TLS backend cannot be initialized.
pub fn build_http_client(config: &StudioConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(config.outbound_timeout)
        .connect_timeout(config.outbound_timeout)
        .user_agent(concat!("gfx-studio-server/", env!("CARGO_PKG_VERSION")))
        .build()
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like the stores and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StudioConfig,
    site: Arc<dyn SiteRepository>,
    auth: AdminAuth,
    visitor_tokens: VisitorTokens,
    discord: DiscordClient,
    notifier: Notifier,
    denylist: Denylist,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Server configuration
    /// * `stores` - Site, credential and session stores
    /// * `http` - Outbound HTTP client (see [`build_http_client`])
    /// * `sink` - Where notifications are delivered
    #[must_use]
    pub fn new(
        config: StudioConfig,
        stores: Stores,
        http: Client,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        let auth = AdminAuth::new(
            PasswordStore::new(stores.credentials),
            SessionStore::new(stores.sessions),
            LockoutGuard::default(),
        );
        let visitor_tokens = VisitorTokens::new(&config.jwt_secret);
        let discord = DiscordClient::new(http, config.discord.clone());

        Self {
            inner: Arc::new(AppStateInner {
                config,
                site: stores.site,
                auth,
                visitor_tokens,
                discord,
                notifier: Notifier::new(sink),
                denylist: Denylist::default(),
            }),
        }
    }

    /// Get a reference to the server configuration.
    #[must_use]
    pub fn config(&self) -> &StudioConfig {
        &self.inner.config
    }

    /// Get a reference to the site document repository.
    #[must_use]
    pub fn site(&self) -> &dyn SiteRepository {
        self.inner.site.as_ref()
    }

    /// Get a reference to the admin authentication service.
    #[must_use]
    pub fn auth(&self) -> &AdminAuth {
        &self.inner.auth
    }

    /// Get a reference to the visitor token manager.
    #[must_use]
    pub fn visitor_tokens(&self) -> &VisitorTokens {
        &self.inner.visitor_tokens
    }

    /// Get a reference to the Discord OAuth client.
    #[must_use]
    pub fn discord(&self) -> &DiscordClient {
        &self.inner.discord
    }

    /// Get a reference to the notifier.
    #[must_use]
    pub fn notifier(&self) -> &Notifier {
        &self.inner.notifier
    }

    /// Get a reference to the review denylist.
    #[must_use]
    pub fn denylist(&self) -> &Denylist {
        &self.inner.denylist
    }
}
