//! Outbound notifications.
//!
//! New reviews and admin login attempts are announced on Discord through
//! incoming webhooks. Delivery is fire-and-forget: it runs on a detached task,
//! failures are logged, and nothing is retried. A notification can never fail
//! or delay the request that caused it.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use gfx_studio_core::Rating;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::config::WebhookConfig;

const COLOR_SUCCESS: u32 = 0x22_C5_5E;
const COLOR_FAILURE: u32 = 0xDC_26_26;
const COLOR_REVIEW: u32 = 0xF5_9E_0B;
const COLOR_FLAGGED: u32 = 0x6B_72_80;

/// Discord caps embed field values at 1024 characters.
const FIELD_VALUE_LIMIT: usize = 1024;

/// Something worth telling the site owner about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// A visitor left a review.
    ReviewSubmitted {
        username: String,
        rating: Rating,
        text: String,
        flagged: bool,
    },
    /// Someone tried the admin password.
    AdminLoginAttempt {
        /// Client identity (network origin) of the attempt.
        identity: String,
        success: bool,
        /// Discord account the admin panel says is logged in, if any.
        discord_user: Option<String>,
    },
}

impl Notification {
    /// Short name for logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::ReviewSubmitted { .. } => "review_submitted",
            Self::AdminLoginAttempt { .. } => "admin_login_attempt",
        }
    }
}

/// Errors from delivering a notification.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// HTTP request failed (including timeouts).
    #[error("webhook request failed: {0}")]
    Request(String),

    /// Webhook endpoint answered with a non-success status.
    #[error("webhook returned status {0}")]
    Status(u16),
}

/// A destination for notifications.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Deliver one notification.
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError>;
}

/// Detaches delivery from the caller and swallows failures.
#[derive(Clone)]
pub struct Notifier {
    sink: Arc<dyn NotificationSink>,
}

impl Notifier {
    /// Create a notifier over `sink`.
    #[must_use]
    pub fn new(sink: Arc<dyn NotificationSink>) -> Self {
        Self { sink }
    }

    /// Send `notification` in the background.
    pub fn notify(&self, notification: Notification) {
        let sink = Arc::clone(&self.sink);
        tokio::spawn(async move {
            if let Err(e) = sink.send(&notification).await {
                warn!(kind = notification.kind(), error = %e, "notification dropped");
            }
        });
    }
}

// =============================================================================
// Discord webhooks
// =============================================================================

/// Posts notifications as Discord embeds.
///
/// Review and admin-alert events go to separate webhooks. An event whose
/// webhook is not configured is dropped.
#[derive(Clone)]
pub struct DiscordWebhookSink {
    client: Client,
    webhooks: WebhookConfig,
}

impl std::fmt::Debug for DiscordWebhookSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordWebhookSink")
            .field("webhooks", &self.webhooks)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize)]
struct WebhookPayload {
    embeds: Vec<Embed>,
}

#[derive(Debug, Serialize)]
struct Embed {
    title: String,
    description: String,
    color: u32,
    fields: Vec<EmbedField>,
    timestamp: String,
}

#[derive(Debug, Serialize)]
struct EmbedField {
    name: String,
    value: String,
    inline: bool,
}

impl EmbedField {
    fn new(name: &str, value: impl Into<String>, inline: bool) -> Self {
        let value: String = value.into();
        let value = if value.chars().count() > FIELD_VALUE_LIMIT {
            let mut cut: String = value.chars().take(FIELD_VALUE_LIMIT - 1).collect();
            cut.push('…');
            cut
        } else {
            value
        };
        Self {
            name: name.to_string(),
            value,
            inline,
        }
    }
}

impl DiscordWebhookSink {
    /// Create a sink. `client` should carry the outbound timeout.
    #[must_use]
    pub const fn new(client: Client, webhooks: WebhookConfig) -> Self {
        Self { client, webhooks }
    }

    fn route(&self, notification: &Notification) -> Option<&SecretString> {
        match notification {
            Notification::ReviewSubmitted { .. } => self.webhooks.review.as_ref(),
            Notification::AdminLoginAttempt { .. } => self.webhooks.admin_alert.as_ref(),
        }
    }
}

fn embed_for(notification: &Notification) -> Embed {
    let timestamp = Utc::now().to_rfc3339();
    match notification {
        Notification::ReviewSubmitted {
            username,
            rating,
            text,
            flagged,
        } => {
            let stars = "⭐".repeat(usize::from(rating.stars()));
            Embed {
                title: if *flagged {
                    "New review (hidden by filter)".to_string()
                } else {
                    "New review".to_string()
                },
                description: stars,
                color: if *flagged { COLOR_FLAGGED } else { COLOR_REVIEW },
                fields: vec![
                    EmbedField::new("Author", format!("`{username}`"), true),
                    EmbedField::new("Rating", rating.to_string(), true),
                    EmbedField::new("Review", text.clone(), false),
                ],
                timestamp,
            }
        }
        Notification::AdminLoginAttempt {
            identity,
            success,
            discord_user,
        } => {
            let account = discord_user.as_deref().unwrap_or("Unknown");
            if *success {
                Embed {
                    title: "Admin login".to_string(),
                    description: "The admin panel was unlocked.".to_string(),
                    color: COLOR_SUCCESS,
                    fields: vec![
                        EmbedField::new("Discord account", format!("`{account}`"), true),
                        EmbedField::new("Client", format!("`{identity}`"), true),
                    ],
                    timestamp,
                }
            } else {
                Embed {
                    title: "Failed admin login".to_string(),
                    description: "Someone tried the admin panel with an incorrect password."
                        .to_string(),
                    color: COLOR_FAILURE,
                    fields: vec![
                        EmbedField::new("Discord account", format!("`{account}`"), true),
                        EmbedField::new("Client", format!("`{identity}`"), true),
                    ],
                    timestamp,
                }
            }
        }
    }
}

#[async_trait]
impl NotificationSink for DiscordWebhookSink {
    #[instrument(skip_all, fields(kind = notification.kind()))]
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        let Some(url) = self.route(notification) else {
            debug!("no webhook configured, notification skipped");
            return Ok(());
        };

        let payload = WebhookPayload {
            embeds: vec![embed_for(notification)],
        };

        let response = self
            .client
            .post(url.expose_secret())
            .json(&payload)
            .send()
            .await
            .map_err(|e| NotifyError::Request(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Status(status.as_u16()));
        }

        debug!("notification delivered");
        Ok(())
    }
}
