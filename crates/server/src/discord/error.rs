//! Discord-related errors.

use thiserror::Error;

/// Errors that can occur when talking to Discord.
#[derive(Debug, Error)]
pub enum DiscordError {
    /// HTTP request failed (including timeouts).
    #[error("Discord request failed: {0}")]
    Request(String),

    /// Discord answered with a non-success status.
    #[error("Discord returned status {status}: {body}")]
    Api { status: u16, body: String },

    /// Failed to parse a response.
    #[error("Discord response error: {0}")]
    Response(String),

    /// The configured API base is not a valid URL.
    #[error("Discord configuration error: {0}")]
    Config(String),
}
