//! Admin panel route handlers.
//!
//! The admin panel talks to a single endpoint. `GET` reads the site document,
//! `POST` dispatches on the `action` field of the JSON body.

use std::collections::BTreeMap;

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use gfx_studio_core::{AssetPack, Order, PartialSiteData, PortfolioItem, Price, Review};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::{AdminSessionResolver, AdminTokenSource, ClientIdentity, OptionalAdmin};
use crate::services::auth::AuthError;
use crate::services::notify::Notification;
use crate::state::AppState;

/// Body of `POST /admin-data`.
#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum AdminRequest {
    /// Exchange the admin password for a bearer token.
    Login {
        password: String,
        /// Discord username the panel has on record, included in alerts.
        #[serde(default, rename = "discordUser")]
        discord_user: Option<String>,
    },
    /// Revoke the caller's token.
    Logout {
        #[serde(default)]
        token: Option<String>,
    },
    /// Rotate the admin password.
    #[serde(rename_all = "camelCase")]
    ChangePassword {
        #[serde(default)]
        token: Option<String>,
        current_password: String,
        new_password: String,
    },
    /// Replace the sections of the site document present in the body.
    SaveData {
        #[serde(default)]
        token: Option<String>,
        #[serde(flatten)]
        data: PartialSiteData,
    },
}

/// Site document as seen by the admin panel.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminDataResponse {
    pub authenticated: bool,
    pub service_prices: BTreeMap<String, Price>,
    pub asset_pack_data: AssetPack,
    pub portfolio: Vec<PortfolioItem>,
    /// Public reviews, or every review when authenticated.
    pub reviews: Vec<Review>,
    /// Only present when authenticated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orders: Option<Vec<Order>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub success: bool,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

const OK: SuccessResponse = SuccessResponse { success: true };

/// Read the site document.
///
/// Without a valid token only the public sections are returned.
///
/// # Route
///
/// `GET /admin-data?token=...`
pub async fn show(
    State(state): State<AppState>,
    OptionalAdmin(session): OptionalAdmin,
) -> Result<Json<AdminDataResponse>> {
    let data = state.site().read().await?;
    let authenticated = session.is_some();

    let reviews = if authenticated {
        data.reviews.clone()
    } else {
        data.public_reviews().cloned().collect()
    };

    Ok(Json(AdminDataResponse {
        authenticated,
        service_prices: data.service_prices,
        asset_pack_data: data.asset_pack_data,
        portfolio: data.portfolio,
        reviews,
        orders: authenticated.then_some(data.orders),
        updated_at: data.updated_at,
    }))
}

/// Answer a bare `OPTIONS` that is not a CORS preflight.
///
/// # Route
///
/// `OPTIONS /admin-data`
pub async fn preflight() -> StatusCode {
    StatusCode::OK
}

/// Dispatch an admin action.
///
/// # Route
///
/// `POST /admin-data`
pub async fn dispatch(
    State(state): State<AppState>,
    identity: ClientIdentity,
    source: AdminTokenSource,
    payload: std::result::Result<Json<AdminRequest>, JsonRejection>,
) -> Result<Json<serde_json::Value>> {
    let Json(request) = payload.map_err(|e| {
        tracing::debug!(error = %e, "rejected admin request body");
        AppError::Validation("Invalid request".to_string())
    })?;

    let body = match request {
        AdminRequest::Login {
            password,
            discord_user,
        } => serde_json::to_value(login(&state, &identity, &password, discord_user).await?),
        AdminRequest::Logout { token } => {
            if let Some(token) = AdminSessionResolver::pick(source, token.as_deref()) {
                state.auth().logout(&token).await?;
                add_breadcrumb("admin", "logout");
            }
            serde_json::to_value(OK)
        }
        AdminRequest::ChangePassword {
            token,
            current_password,
            new_password,
        } => {
            let token =
                AdminSessionResolver::pick(source, token.as_deref()).ok_or(AppError::Unauthorized)?;
            state
                .auth()
                .change_password(identity.as_str(), &token, &current_password, &new_password)
                .await?;
            add_breadcrumb("admin", "password changed");
            serde_json::to_value(OK)
        }
        AdminRequest::SaveData { token, data } => {
            let token = AdminSessionResolver::pick(source, token.as_deref());
            AdminSessionResolver::resolve(&state, token.as_deref()).await?;

            let now = Utc::now();
            let partial = data.sanitized(now);
            state.site().write(partial, now).await?;
            add_breadcrumb("admin", "site data saved");
            tracing::info!("site data saved");
            serde_json::to_value(OK)
        }
    };

    body.map(Json)
        .map_err(|e| AppError::Internal(format!("failed to encode response: {e}")))
}

async fn login(
    state: &AppState,
    identity: &ClientIdentity,
    password: &str,
    discord_user: Option<String>,
) -> Result<LoginResponse> {
    let result = state.auth().login(identity.as_str(), password).await;

    let attempted = matches!(
        result,
        Ok(_) | Err(AuthError::InvalidCredentials | AuthError::Locked { .. })
    );
    if attempted {
        state.notifier().notify(Notification::AdminLoginAttempt {
            identity: identity.to_string(),
            success: result.is_ok(),
            discord_user,
        });
    }

    let issued = result?;
    add_breadcrumb("admin", "login");
    Ok(LoginResponse {
        success: true,
        token: issued.token,
        expires_at: issued.expires_at,
    })
}
