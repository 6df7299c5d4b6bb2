//! HTTP middleware and extractors.
//!
//! # Layer order (outermost first)
//!
//! 1. Sentry layers (hub per request, transaction per route)
//! 2. `TraceLayer` (request tracing)
//! 3. Admin CORS, on `/admin-data` only

pub mod auth;
pub mod cors;
pub mod identity;

pub use auth::{
    AdminSessionResolver, AdminTokenSource, OptionalAdmin, OptionalVisitor, RequireVisitor,
    VISITOR_COOKIE,
};
pub use cors::admin_cors;
pub use identity::ClientIdentity;
