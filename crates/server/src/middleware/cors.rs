//! CORS policy for the admin panel endpoint.
//!
//! The admin panel may be served from a different origin than the API, so
//! `/admin-data` accepts any origin. The bearer token is what guards it.

use axum::http::{Method, header};
use tower_http::cors::{Any, CorsLayer};

/// How long browsers may cache a preflight response.
const PREFLIGHT_MAX_AGE: std::time::Duration = std::time::Duration::from_secs(600);

/// CORS layer for `/admin-data`.
#[must_use]
pub fn admin_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .max_age(PREFLIGHT_MAX_AGE)
}
