//! Business logic services.
//!
//! # Services
//!
//! - `auth` - Admin password, sessions and brute-force lockout
//! - `notify` - Discord webhook notifications (fire-and-forget)
//! - `visitor` - Signed visitor tokens issued after Discord login

pub mod auth;
pub mod notify;
pub mod visitor;
