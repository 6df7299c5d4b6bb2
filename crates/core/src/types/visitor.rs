//! Visitor identity derived from a Discord login.

use serde::{Deserialize, Serialize};

/// A logged-in site visitor.
///
/// Built from the Discord user profile at login and carried inside the signed
/// visitor token. Never persisted server-side except as the author of a review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitorIdentity {
    /// Discord user snowflake.
    pub id: String,
    pub username: String,
    /// Discord avatar hash, if the user has one.
    #[serde(default)]
    pub avatar: Option<String>,
}
