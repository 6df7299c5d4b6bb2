//! Server-side records for the admin account.
//!
//! Everything the public site shows lives in the site document
//! ([`gfx_studio_core::SiteData`]); the types here are private to the server.

pub mod admin;

pub use admin::{AdminCredential, AdminSession};
