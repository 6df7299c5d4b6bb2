//! Authentication extractors.
//!
//! Two unrelated kinds of caller:
//! - Visitors, identified by the signed `auth_token` cookie set after Discord login
//! - The admin, identified by a bearer token from `POST /admin-data` login
//!
//! Admin tokens arrive in an `Authorization: Bearer` header, a JSON body
//! `token` field, or a `?token=` query parameter. [`AdminSessionResolver`]
//! is the one place that decides which one counts.

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use axum_extra::extract::CookieJar;
use gfx_studio_core::VisitorIdentity;

use crate::error::AppError;
use crate::models::AdminSession;
use crate::services::auth::AuthError;
use crate::state::AppState;

/// Name of the visitor session cookie.
pub const VISITOR_COOKIE: &str = "auth_token";

// =============================================================================
// Visitors
// =============================================================================

/// Extractor that requires a logged-in visitor.
///
/// Rejects with `401` if the cookie is missing, forged or expired.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(RequireVisitor(visitor): RequireVisitor) -> String {
///     format!("Hello, {}!", visitor.username)
/// }
/// ```
pub struct RequireVisitor(pub VisitorIdentity);

impl FromRequestParts<AppState> for RequireVisitor {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        OptionalVisitor::from_request_parts(parts, state)
            .await
            .ok()
            .and_then(|OptionalVisitor(visitor)| visitor)
            .map(Self)
            .ok_or(AppError::Unauthorized)
    }
}

/// Extractor that optionally gets the current visitor.
pub struct OptionalVisitor(pub Option<VisitorIdentity>);

impl FromRequestParts<AppState> for OptionalVisitor {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let visitor = jar.get(VISITOR_COOKIE).and_then(|cookie| {
            state
                .visitor_tokens()
                .verify(cookie.value())
                .map_err(|e| tracing::debug!(error = %e, "ignoring invalid visitor cookie"))
                .ok()
        });

        Ok(Self(visitor))
    }
}

// =============================================================================
// Admin
// =============================================================================

/// Admin token carried outside the body: bearer header first, then query.
#[derive(Debug, Default)]
pub struct AdminTokenSource(pub Option<String>);

impl<S> FromRequestParts<S> for AdminTokenSource
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let bearer = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_owned);

        let query = || {
            parts.uri.query().and_then(|q| {
                url::form_urlencoded::parse(q.as_bytes())
                    .find(|(key, _)| key == "token")
                    .map(|(_, value)| value.into_owned())
                    .filter(|t| !t.is_empty())
            })
        };

        Ok(Self(bearer.or_else(query)))
    }
}

/// Resolves an admin token from its possible sources to a live session.
pub struct AdminSessionResolver;

impl AdminSessionResolver {
    /// Pick the token to use: header/query source, else the body field.
    #[must_use]
    pub fn pick(source: AdminTokenSource, body_token: Option<&str>) -> Option<String> {
        source.0.or_else(|| {
            body_token
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_owned)
        })
    }

    /// Validate `token` against the session store.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Unauthorized` when there is no token or it is not
    /// a live session.
    pub async fn resolve(
        state: &AppState,
        token: Option<&str>,
    ) -> Result<AdminSession, AppError> {
        let token = token.ok_or(AppError::Unauthorized)?;
        match state.auth().authorize(token).await {
            Ok(session) => Ok(session),
            Err(AuthError::InvalidSession) => Err(AppError::Unauthorized),
            Err(other) => Err(other.into()),
        }
    }
}

/// Extractor that optionally resolves the admin session from header or query.
///
/// An invalid token yields `None`, not an error. Store failures still
/// surface as `500`.
pub struct OptionalAdmin(pub Option<AdminSession>);

impl FromRequestParts<AppState> for OptionalAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Ok(AdminTokenSource(token)) = AdminTokenSource::from_request_parts(parts, state).await;
        match AdminSessionResolver::resolve(state, token.as_deref()).await {
            Ok(session) => Ok(Self(Some(session))),
            Err(AppError::Unauthorized) => Ok(Self(None)),
            Err(other) => Err(other),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::Request;

    use super::*;

    async fn source(req: Request<()>) -> AdminTokenSource {
        let (mut parts, ()) = req.into_parts();
        let Ok(source) = AdminTokenSource::from_request_parts(&mut parts, &()).await;
        source
    }

    #[tokio::test]
    async fn test_bearer_preferred_over_query() {
        let req = Request::builder()
            .uri("/admin-data?token=from-query")
            .header("authorization", "Bearer from-header")
            .body(())
            .unwrap();
        assert_eq!(source(req).await.0.as_deref(), Some("from-header"));
    }

    #[tokio::test]
    async fn test_query_token() {
        let req = Request::builder()
            .uri("/admin-data?x=1&token=abc%20def")
            .body(())
            .unwrap();
        assert_eq!(source(req).await.0.as_deref(), Some("abc def"));
    }

    #[tokio::test]
    async fn test_no_token() {
        let req = Request::builder().uri("/admin-data").body(()).unwrap();
        assert!(source(req).await.0.is_none());
    }

    #[test]
    fn test_pick_falls_back_to_body() {
        assert_eq!(
            AdminSessionResolver::pick(AdminTokenSource(None), Some("body")).as_deref(),
            Some("body")
        );
        assert_eq!(
            AdminSessionResolver::pick(AdminTokenSource(Some("hdr".into())), Some("body"))
                .as_deref(),
            Some("hdr")
        );
        assert!(AdminSessionResolver::pick(AdminTokenSource(None), Some("  ")).is_none());
    }
}
