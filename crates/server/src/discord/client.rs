//! Discord OAuth2 client.

use reqwest::Client;
use secrecy::ExposeSecret;
use tracing::{debug, instrument, warn};
use url::Url;

use super::error::DiscordError;
use super::types::{DiscordUser, TokenResponse};
use crate::config::DiscordConfig;

/// OAuth scopes requested from visitors.
const SCOPES: &str = "identify email";

/// Discord OAuth2 client for visitor login.
#[derive(Clone)]
pub struct DiscordClient {
    /// HTTP client, carrying the outbound timeout.
    client: Client,
    config: DiscordConfig,
}

impl std::fmt::Debug for DiscordClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl DiscordClient {
    /// Create a new Discord client.
    #[must_use]
    pub const fn new(client: Client, config: DiscordConfig) -> Self {
        Self { client, config }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.config.api_base)
    }

    /// URL of Discord's consent screen, carrying `state` for CSRF protection.
    ///
    /// # Errors
    ///
    /// Returns `DiscordError::Config` if the API base is not a valid URL.
    pub fn authorize_url(&self, state: &str) -> Result<String, DiscordError> {
        let url = Url::parse_with_params(
            &self.endpoint("oauth2/authorize"),
            &[
                ("client_id", self.config.client_id.as_str()),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("response_type", "code"),
                ("scope", SCOPES),
                ("state", state),
            ],
        )
        .map_err(|e| DiscordError::Config(e.to_string()))?;

        Ok(url.into())
    }

    /// Exchange an authorization code for an access token.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or Discord rejects the code.
    #[instrument(skip_all)]
    pub async fn exchange_code(&self, code: &str) -> Result<TokenResponse, DiscordError> {
        let form = [
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.expose_secret()),
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.config.redirect_uri.as_str()),
        ];

        let response = self
            .client
            .post(self.endpoint("oauth2/token"))
            .form(&form)
            .send()
            .await
            .map_err(|e| DiscordError::Request(e.to_string()))?;

        let token: TokenResponse = Self::parse(response).await?;
        debug!(scope = ?token.scope, "exchanged Discord authorization code");
        Ok(token)
    }

    /// Fetch the profile of the user owning `access_token`.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the token is rejected.
    #[instrument(skip_all)]
    pub async fn fetch_user(&self, access_token: &str) -> Result<DiscordUser, DiscordError> {
        let response = self
            .client
            .get(self.endpoint("users/@me"))
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| DiscordError::Request(e.to_string()))?;

        let user: DiscordUser = Self::parse(response).await?;
        debug!(user_id = %user.id, "fetched Discord profile");
        Ok(user)
    }

    async fn parse<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, DiscordError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "Discord API error");
            return Err(DiscordError::Api {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| DiscordError::Response(e.to_string()))
    }
}
