//! Integration tests for GFX Studio.
//!
//! Every test spawns the real router on an ephemeral port with in-memory
//! stores, a recording notification sink, and a wiremock server standing in
//! for the Discord API. No database or network access is needed.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p gfx-studio-integration-tests
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]
#![allow(clippy::missing_panics_doc)]

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use gfx_studio_core::{SiteData, VisitorIdentity};
use gfx_studio_server::config::{DiscordConfig, LogFormat, StudioConfig, WebhookConfig};
use gfx_studio_server::services::notify::{Notification, NotificationSink, NotifyError};
use gfx_studio_server::state::{AppState, Stores};
use reqwest::{Client, Response};
use secrecy::SecretString;
use serde_json::{Value, json};
use tokio::sync::{Mutex, mpsc};
use wiremock::MockServer;

/// Admin password stored at startup.
pub const ADMIN_PASSWORD: &str = "correct horse battery staple";

/// Client identity used by [`TestApp::admin_token`].
pub const ADMIN_IP: &str = "203.0.113.10";

const JWT_SECRET: &str = "k9$Qv2#Lm8!Zr4@Tx7^Wp1&Hn6*Bd3%Fj";

/// How long to wait for a detached notification to arrive.
const NOTIFICATION_WAIT: Duration = Duration::from_secs(2);

/// Sink that forwards every notification to the test.
struct RecordingSink(mpsc::UnboundedSender<Notification>);

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        // The receiver may already be gone at the end of a test.
        let _ = self.0.send(notification.clone());
        Ok(())
    }
}

/// Configuration pointing Discord at `discord_base`.
#[must_use]
pub fn test_config(discord_base: &str) -> StudioConfig {
    StudioConfig {
        database_url: SecretString::from("postgres://unused"),
        host: Ipv4Addr::LOCALHOST.into(),
        port: 0,
        base_url: "http://localhost".to_string(),
        trust_proxy_headers: true,
        jwt_secret: SecretString::from(JWT_SECRET),
        discord: DiscordConfig {
            client_id: "1234567890".to_string(),
            client_secret: SecretString::from("discord-client-s3cr3t"),
            redirect_uri: "http://localhost/auth".to_string(),
            api_base: discord_base.to_string(),
        },
        webhooks: WebhookConfig::default(),
        admin_bootstrap_password: None,
        site_defaults_file: None,
        outbound_timeout: Duration::from_secs(2),
        log_format: LogFormat::default(),
        sentry_dsn: None,
        sentry_environment: None,
    }
}

/// A running server plus handles to its collaborators.
pub struct TestApp {
    pub base_url: String,
    /// Client that does not follow redirects.
    pub client: Client,
    pub state: AppState,
    /// Stand-in for `https://discord.com/api`.
    pub discord: MockServer,
    notifications: Mutex<mpsc::UnboundedReceiver<Notification>>,
}

impl TestApp {
    /// Spawn a server that records notifications.
    pub async fn spawn() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self::start(Arc::new(RecordingSink(tx)), rx).await
    }

    /// Spawn a server delivering notifications to `sink`.
    pub async fn spawn_with_sink(sink: Arc<dyn NotificationSink>) -> Self {
        let (_tx, rx) = mpsc::unbounded_channel();
        Self::start(sink, rx).await
    }

    async fn start(
        sink: Arc<dyn NotificationSink>,
        notifications: mpsc::UnboundedReceiver<Notification>,
    ) -> Self {
        let discord = MockServer::start().await;
        let config = test_config(&discord.uri());

        let http = Client::builder()
            .timeout(config.outbound_timeout)
            .build()
            .expect("Failed to create HTTP client");
        let state = AppState::new(config, Stores::in_memory(SiteData::default()), http, sink);
        state
            .auth()
            .passwords()
            .bootstrap(ADMIN_PASSWORD)
            .await
            .expect("Failed to store admin password");

        let listener = tokio::net::TcpListener::bind((Ipv4Addr::LOCALHOST, 0))
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("Listener has no address");

        let app = gfx_studio_server::app(state.clone());
        tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .expect("Test server failed");
        });

        let client = Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: format!("http://{addr}"),
            client,
            state,
            discord,
            notifications: Mutex::new(notifications),
        }
    }

    /// Absolute URL for `path`.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// `POST /admin-data` from client `ip`.
    pub async fn post_admin(&self, ip: &str, body: &Value) -> Response {
        self.client
            .post(self.url("/admin-data"))
            .header("x-forwarded-for", ip)
            .json(body)
            .send()
            .await
            .expect("Failed to POST /admin-data")
    }

    /// Attempt an admin login from client `ip`.
    pub async fn admin_login(&self, ip: &str, password: &str) -> Response {
        self.post_admin(ip, &json!({ "action": "login", "password": password }))
            .await
    }

    /// Log in with the correct password and return the bearer token.
    pub async fn admin_token(&self) -> String {
        let resp = self.admin_login(ADMIN_IP, ADMIN_PASSWORD).await;
        assert_eq!(resp.status(), 200, "admin login failed");
        let body: Value = resp.json().await.expect("Login response is not JSON");
        body["token"]
            .as_str()
            .expect("Login response has no token")
            .to_string()
    }

    /// `GET /admin-data`, optionally with `?token=`.
    pub async fn get_admin_data(&self, token: Option<&str>) -> Value {
        // Tokens are hex, so they need no escaping.
        let path = token.map_or_else(|| "/admin-data".to_string(), |t| format!("/admin-data?token={t}"));
        let resp = self
            .client
            .get(self.url(&path))
            .send()
            .await
            .expect("Failed to GET /admin-data");
        assert_eq!(resp.status(), 200);
        resp.json().await.expect("admin-data response is not JSON")
    }

    /// `Cookie` header value for a logged-in visitor.
    #[must_use]
    pub fn visitor_cookie(&self, id: &str, username: &str) -> String {
        let token = self
            .state
            .visitor_tokens()
            .issue(&VisitorIdentity {
                id: id.to_string(),
                username: username.to_string(),
                avatar: None,
            })
            .expect("Failed to sign visitor token");
        format!("auth_token={token}")
    }

    /// `POST /reviews` with the given cookie header.
    pub async fn post_review(&self, cookie: Option<&str>, body: &Value) -> Response {
        let mut req = self.client.post(self.url("/reviews")).json(body);
        if let Some(cookie) = cookie {
            req = req.header("cookie", cookie);
        }
        req.send().await.expect("Failed to POST /reviews")
    }

    /// The next recorded notification, or `None` if none arrives in time.
    pub async fn next_notification(&self) -> Option<Notification> {
        let mut rx = self.notifications.lock().await;
        tokio::time::timeout(NOTIFICATION_WAIT, rx.recv())
            .await
            .ok()
            .flatten()
    }
}
