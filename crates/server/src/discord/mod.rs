//! Discord OAuth2 integration.
//!
//! Visitors log in with Discord so reviews carry a real Discord identity.
//! Only the `identify email` scope is requested, and only the profile's id,
//! username and avatar are kept.

mod client;
mod error;
mod types;

pub use client::DiscordClient;
pub use error::DiscordError;
pub use types::{DiscordUser, TokenResponse};
