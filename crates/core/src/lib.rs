//! GFX Studio Core - Shared domain types.
//!
//! This crate provides the types used by every GFX Studio component:
//! - `server` - Public review API, Discord login, and the admin panel API
//! - `cli` - Migrations and admin credential management
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP clients. Everything here can be unit tested without a runtime.
//!
//! # Modules
//!
//! - [`types`] - Site document, reviews, orders, portfolio, prices
//! - [`sanitize`] - HTML escaping for stored free text
//! - [`moderation`] - Denylist classification of review text

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod moderation;
pub mod sanitize;
pub mod types;

pub use moderation::Denylist;
pub use sanitize::escape_html;
pub use types::*;
