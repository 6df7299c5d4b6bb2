//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STUDIO_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `STUDIO_JWT_SECRET` - Visitor token signing secret (min 32 chars, high entropy)
//! - `DISCORD_CLIENT_ID` - Discord OAuth application ID
//! - `DISCORD_CLIENT_SECRET` - Discord OAuth application secret
//! - `DISCORD_REDIRECT_URI` - OAuth callback URL registered with Discord
//!
//! ## Optional
//! - `STUDIO_HOST` - Bind address (default: 127.0.0.1)
//! - `STUDIO_PORT` - Listen port (default: 3000)
//! - `STUDIO_BASE_URL` - Public URL of the site (default: <http://localhost:3000>)
//! - `DISCORD_API_BASE` - Discord API root (default: <https://discord.com/api>)
//! - `STUDIO_ADMIN_ALERT_WEBHOOK` - Discord webhook for admin login alerts
//! - `STUDIO_REVIEW_WEBHOOK` - Discord webhook for new reviews
//! - `STUDIO_ADMIN_PASSWORD` - Initial admin password, used only when none is stored
//! - `STUDIO_SITE_DEFAULTS_FILE` - JSON file overriding the default site document
//! - `STUDIO_OUTBOUND_TIMEOUT_SECS` - Timeout for Discord calls (default: 5)
//! - `STUDIO_LOG_FORMAT` - `pretty` or `json` (default: pretty)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment tag

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use gfx_studio_core::SiteData;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

const MIN_SESSION_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;
const DEFAULT_DISCORD_API_BASE: &str = "https://discord.com/api";

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(format!("expected 'pretty' or 'json', got '{other}'")),
        }
    }
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct StudioConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL of the site
    pub base_url: String,
    /// Take the client address from proxy headers. Only safe when every
    /// request arrives through a proxy that overwrites them.
    pub trust_proxy_headers: bool,
    /// Visitor token signing secret
    pub jwt_secret: SecretString,
    /// Discord OAuth configuration
    pub discord: DiscordConfig,
    /// Outbound notification webhooks
    pub webhooks: WebhookConfig,
    /// Initial admin password, hashed into the store on first start
    pub admin_bootstrap_password: Option<SecretString>,
    /// Optional JSON file replacing the built-in default site document
    pub site_defaults_file: Option<PathBuf>,
    /// Upper bound on every outbound Discord call
    pub outbound_timeout: Duration,
    /// Log output format
    pub log_format: LogFormat,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment tag
    pub sentry_environment: Option<String>,
}

/// Discord OAuth application configuration.
///
/// Implements `Debug` manually to redact secret fields.
#[derive(Clone)]
pub struct DiscordConfig {
    /// OAuth application (client) ID
    pub client_id: String,
    /// OAuth application secret
    pub client_secret: SecretString,
    /// Callback URL registered with Discord
    pub redirect_uri: String,
    /// API root, overridable for tests
    pub api_base: String,
}

impl std::fmt::Debug for DiscordConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("redirect_uri", &self.redirect_uri)
            .field("api_base", &self.api_base)
            .finish()
    }
}

/// Discord incoming webhook URLs. The URLs embed a token, so they are secrets.
#[derive(Clone, Default)]
pub struct WebhookConfig {
    /// Admin login alerts
    pub admin_alert: Option<SecretString>,
    /// New review announcements
    pub review: Option<SecretString>,
}

impl std::fmt::Debug for WebhookConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |v: &Option<SecretString>| v.as_ref().map(|_| "[REDACTED]");
        f.debug_struct("WebhookConfig")
            .field("admin_alert", &redact(&self.admin_alert))
            .field("review", &redact(&self.review))
            .finish()
    }
}

impl StudioConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("STUDIO_DATABASE_URL")?;
        let host = get_env_or_default("STUDIO_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("STUDIO_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("STUDIO_PORT", "3000")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("STUDIO_PORT".to_string(), e.to_string()))?;
        let base_url = get_url_or_default("STUDIO_BASE_URL", "http://localhost:3000")?;
        let trust_proxy_headers = get_env_or_default("STUDIO_TRUST_PROXY_HEADERS", "true")
            .parse::<bool>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("STUDIO_TRUST_PROXY_HEADERS".to_string(), e.to_string())
            })?;
        let jwt_secret = get_validated_secret("STUDIO_JWT_SECRET")?;
        validate_session_secret(&jwt_secret, "STUDIO_JWT_SECRET")?;

        let discord = DiscordConfig::from_env()?;
        let webhooks = WebhookConfig::from_env();

        let outbound_timeout = get_env_or_default("STUDIO_OUTBOUND_TIMEOUT_SECS", "5")
            .parse::<u64>()
            .ok()
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .ok_or_else(|| {
                ConfigError::InvalidEnvVar(
                    "STUDIO_OUTBOUND_TIMEOUT_SECS".to_string(),
                    "must be a positive number of seconds".to_string(),
                )
            })?;

        let log_format = get_env_or_default("STUDIO_LOG_FORMAT", "pretty")
            .parse::<LogFormat>()
            .map_err(|e| ConfigError::InvalidEnvVar("STUDIO_LOG_FORMAT".to_string(), e))?;

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            trust_proxy_headers,
            jwt_secret,
            discord,
            webhooks,
            admin_bootstrap_password: get_optional_env("STUDIO_ADMIN_PASSWORD")
                .map(SecretString::from),
            site_defaults_file: get_optional_env("STUDIO_SITE_DEFAULTS_FILE").map(PathBuf::from),
            outbound_timeout,
            log_format,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether cookies should carry the `Secure` attribute.
    #[must_use]
    pub fn secure_cookies(&self) -> bool {
        self.base_url.starts_with("https://")
    }

    /// The default site document served before anything has been saved.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if the defaults file cannot be read
    /// or does not contain a valid site document.
    pub fn site_defaults(&self) -> Result<SiteData, ConfigError> {
        let Some(path) = &self.site_defaults_file else {
            return Ok(SiteData::default());
        };

        let invalid = |msg: String| {
            ConfigError::InvalidEnvVar("STUDIO_SITE_DEFAULTS_FILE".to_string(), msg)
        };

        let raw = std::fs::read_to_string(path)
            .map_err(|e| invalid(format!("{}: {e}", path.display())))?;
        let value: serde_json::Value =
            serde_json::from_str(&raw).map_err(|e| invalid(e.to_string()))?;

        SiteData::from_stored(&SiteData::default(), value).map_err(|e| invalid(e.to_string()))
    }
}

impl DiscordConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let redirect_uri = get_required_env("DISCORD_REDIRECT_URI")?;
        Url::parse(&redirect_uri).map_err(|e| {
            ConfigError::InvalidEnvVar("DISCORD_REDIRECT_URI".to_string(), e.to_string())
        })?;

        Ok(Self {
            client_id: get_required_env("DISCORD_CLIENT_ID")?,
            client_secret: get_validated_secret("DISCORD_CLIENT_SECRET")?,
            redirect_uri,
            api_base: get_url_or_default("DISCORD_API_BASE", DEFAULT_DISCORD_API_BASE)?,
        })
    }
}

impl WebhookConfig {
    fn from_env() -> Self {
        Self {
            admin_alert: get_optional_env("STUDIO_ADMIN_ALERT_WEBHOOK").map(SecretString::from),
            review: get_optional_env("STUDIO_REVIEW_WEBHOOK").map(SecretString::from),
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL` (used by Fly.io postgres attach).
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable. Empty values count as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Get a URL-valued variable, stripped of any trailing slash.
fn get_url_or_default(key: &str, default: &str) -> Result<String, ConfigError> {
    let value = get_env_or_default(key, default);
    Url::parse(&value).map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    Ok(value.trim_end_matches('/').to_string())
}

/// Validate that a session secret meets minimum length requirements.
fn validate_session_secret(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_SESSION_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_SESSION_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}
