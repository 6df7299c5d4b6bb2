//! Discord OAuth route handlers for visitors.
//!
//! One endpoint handles the whole flow:
//! - `GET /auth?action=login` - Redirect to Discord's consent screen
//! - `GET /auth?code=...&state=...` - OAuth callback, sets the visitor cookie
//! - `GET /auth?action=me` - Who is logged in
//! - `POST /auth {"action":"logout"}` - Clear the visitor cookie

use axum::{
    Json,
    extract::{Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use gfx_studio_core::VisitorIdentity;
use rand::distr::{Alphanumeric, SampleString};
use serde::Deserialize;
use serde_json::json;

use crate::error::{AppError, Result};
use crate::middleware::{OptionalVisitor, VISITOR_COOKIE};
use crate::state::AppState;

/// Cookie carrying the OAuth CSRF state between login and callback.
pub const OAUTH_STATE_COOKIE: &str = "oauth_state";

/// Where to send the visitor after a successful login.
pub const LOGIN_SUCCESS_REDIRECT: &str = "/?login=success#reviews";

/// Where to send the visitor after a failed login.
pub const LOGIN_FAILURE_REDIRECT: &str = "/?error=auth_failed";

const OAUTH_STATE_TTL: time::Duration = time::Duration::minutes(10);
const OAUTH_STATE_LEN: usize = 32;

/// Query parameters of `GET /auth`.
#[derive(Debug, Default, Deserialize)]
pub struct AuthQuery {
    pub action: Option<String>,
    /// Authorization code from the Discord callback.
    pub code: Option<String>,
    /// CSRF state echoed back by Discord.
    pub state: Option<String>,
    /// Error code if the visitor declined.
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AuthAction {
    pub action: String,
}

/// Handle `GET /auth`.
pub async fn dispatch_get(
    State(state): State<AppState>,
    jar: CookieJar,
    OptionalVisitor(visitor): OptionalVisitor,
    Query(query): Query<AuthQuery>,
) -> Result<Response> {
    if query.code.is_some() || query.error.is_some() {
        return Ok(callback(&state, jar, query).await);
    }

    match query.action.as_deref() {
        Some("login") => login(&state, jar),
        Some("me") => Ok(me(visitor)),
        _ => Err(AppError::Validation("Invalid auth request".to_string())),
    }
}

/// Handle `POST /auth`.
pub async fn dispatch_post(
    State(state): State<AppState>,
    jar: CookieJar,
    payload: std::result::Result<Json<AuthAction>, JsonRejection>,
) -> Result<Response> {
    match payload {
        Ok(Json(AuthAction { action })) if action == "logout" => {
            let jar = jar.remove(removal_cookie(&state, VISITOR_COOKIE));
            tracing::debug!("visitor logged out");
            Ok((jar, Json(json!({ "success": true }))).into_response())
        }
        _ => Err(AppError::Validation("Invalid auth request".to_string())),
    }
}

fn login(state: &AppState, jar: CookieJar) -> Result<Response> {
    let csrf = Alphanumeric.sample_string(&mut rand::rng(), OAUTH_STATE_LEN);
    let url = state.discord().authorize_url(&csrf)?;

    let cookie = Cookie::build((OAUTH_STATE_COOKIE, csrf))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(state.config().secure_cookies())
        .max_age(OAUTH_STATE_TTL);

    Ok((jar.add(cookie), Redirect::to(&url)).into_response())
}

fn me(visitor: Option<VisitorIdentity>) -> Response {
    match visitor {
        Some(user) => Json(json!({ "authenticated": true, "user": user })).into_response(),
        None => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "authenticated": false })),
        )
            .into_response(),
    }
}

/// Finish the OAuth flow. Every failure ends in a redirect, never an error page.
async fn callback(state: &AppState, jar: CookieJar, query: AuthQuery) -> Response {
    let expected = jar.get(OAUTH_STATE_COOKIE).map(|c| c.value().to_owned());
    let jar = jar.remove(removal_cookie(state, OAUTH_STATE_COOKIE));

    match complete_login(state, expected.as_deref(), &query).await {
        Ok(token) => {
            let cookie = Cookie::build((VISITOR_COOKIE, token))
                .path("/")
                .http_only(true)
                .same_site(SameSite::Lax)
                .secure(state.config().secure_cookies())
                .max_age(time::Duration::seconds(
                    state.visitor_tokens().ttl().num_seconds(),
                ));
            (jar.add(cookie), Redirect::to(LOGIN_SUCCESS_REDIRECT)).into_response()
        }
        Err(reason) => {
            tracing::warn!(reason = %reason, "Discord login failed");
            (jar, Redirect::to(LOGIN_FAILURE_REDIRECT)).into_response()
        }
    }
}

async fn complete_login(
    state: &AppState,
    expected_state: Option<&str>,
    query: &AuthQuery,
) -> std::result::Result<String, String> {
    if let Some(error) = &query.error {
        return Err(format!("authorization denied: {error}"));
    }
    let code = query.code.as_deref().ok_or("missing code")?;

    match (expected_state, query.state.as_deref()) {
        (Some(expected), Some(returned)) if expected == returned => {}
        _ => return Err("OAuth state mismatch".to_string()),
    }

    let discord = state.discord();
    let token = discord
        .exchange_code(code)
        .await
        .map_err(|e| e.to_string())?;
    let user = discord
        .fetch_user(&token.access_token)
        .await
        .map_err(|e| e.to_string())?;

    let visitor = VisitorIdentity::from(user);
    tracing::info!(user_id = %visitor.id, "visitor logged in with Discord");

    state
        .visitor_tokens()
        .issue(&visitor)
        .map_err(|e| e.to_string())
}

fn removal_cookie(state: &AppState, name: &'static str) -> Cookie<'static> {
    Cookie::build(name)
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(state.config().secure_cookies())
        .build()
}
