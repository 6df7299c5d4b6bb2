//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET     /health          - Liveness check
//! GET     /health/ready    - Readiness check (document store reachable)
//!
//! # Reviews
//! GET     /reviews         - Public reviews
//! POST    /reviews         - Submit a review (visitor cookie required)
//!
//! # Admin panel (CORS: any origin)
//! GET     /admin-data      - Site document, orders only with a valid token
//! POST    /admin-data      - login | logout | changePassword | saveData
//! OPTIONS /admin-data      - Preflight
//!
//! # Visitor login
//! GET     /auth            - ?action=login | ?action=me | OAuth callback
//! POST    /auth            - {"action": "logout"}
//! ```

pub mod admin;
pub mod auth;
pub mod reviews;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::get,
};
use tower_http::trace::TraceLayer;

use crate::error::AppError;
use crate::middleware::admin_cors;
use crate::state::AppState;

/// Create the API routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/reviews",
            get(reviews::list)
                .post(reviews::submit)
                .fallback(method_not_allowed),
        )
        .route(
            "/admin-data",
            get(admin::show)
                .post(admin::dispatch)
                .options(admin::preflight)
                .fallback(method_not_allowed)
                .layer(admin_cors()),
        )
        .route(
            "/auth",
            get(auth::dispatch_get)
                .post(auth::dispatch_post)
                .fallback(method_not_allowed),
        )
}

/// The complete application router, ready for `axum::serve`.
///
/// Sentry layers are added by the binary so tests run without a hub.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
pub async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the document store is not reachable.
pub async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.site().ping().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}
