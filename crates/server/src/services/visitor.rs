//! Signed visitor tokens.
//!
//! After Discord login the visitor's identity is packed into an HS256 JWT and
//! stored in an HTTP-only cookie. Nothing about visitors is kept server-side.

use chrono::{DateTime, Duration, Utc};
use gfx_studio_core::VisitorIdentity;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Visitor token lifetime.
pub const VISITOR_TOKEN_TTL: Duration = Duration::days(7);

/// Errors from issuing or reading visitor tokens.
#[derive(Debug, Error)]
pub enum VisitorTokenError {
    /// The token could not be signed.
    #[error("failed to sign visitor token: {0}")]
    Encode(#[source] jsonwebtoken::errors::Error),

    /// The token is malformed, forged or expired.
    #[error("invalid visitor token")]
    Invalid(#[source] jsonwebtoken::errors::Error),
}

#[derive(Debug, Serialize, Deserialize)]
struct VisitorClaims {
    id: String,
    username: String,
    #[serde(default)]
    avatar: Option<String>,
    iat: i64,
    exp: i64,
}

/// Issues and verifies visitor tokens.
#[derive(Clone)]
pub struct VisitorTokens {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl std::fmt::Debug for VisitorTokens {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VisitorTokens")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl VisitorTokens {
    /// Create a token manager signing with `secret`.
    #[must_use]
    pub fn new(secret: &SecretString) -> Self {
        let bytes = secret.expose_secret().as_bytes();
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        Self {
            encoding_key: EncodingKey::from_secret(bytes),
            decoding_key: DecodingKey::from_secret(bytes),
            validation,
            ttl: VISITOR_TOKEN_TTL,
        }
    }

    /// Token lifetime, for the matching cookie `Max-Age`.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Sign a token for `visitor`.
    ///
    /// # Errors
    ///
    /// Returns `VisitorTokenError::Encode` if signing fails.
    pub fn issue(&self, visitor: &VisitorIdentity) -> Result<String, VisitorTokenError> {
        self.issue_at(visitor, Utc::now())
    }

    /// Sign a token for `visitor` as of `now`.
    ///
    /// # Errors
    ///
    /// Returns `VisitorTokenError::Encode` if signing fails.
    pub fn issue_at(
        &self,
        visitor: &VisitorIdentity,
        now: DateTime<Utc>,
    ) -> Result<String, VisitorTokenError> {
        let claims = VisitorClaims {
            id: visitor.id.clone(),
            username: visitor.username.clone(),
            avatar: visitor.avatar.clone(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };

        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(VisitorTokenError::Encode)
    }

    /// Verify a token and recover the visitor.
    ///
    /// # Errors
    ///
    /// Returns `VisitorTokenError::Invalid` for bad signatures, malformed
    /// tokens and expired tokens.
    pub fn verify(&self, token: &str) -> Result<VisitorIdentity, VisitorTokenError> {
        let data = jsonwebtoken::decode::<VisitorClaims>(token, &self.decoding_key, &self.validation)
            .map_err(VisitorTokenError::Invalid)?;

        Ok(VisitorIdentity {
            id: data.claims.id,
            username: data.claims.username,
            avatar: data.claims.avatar,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn tokens(secret: &str) -> VisitorTokens {
        VisitorTokens::new(&SecretString::from(secret))
    }

    fn visitor() -> VisitorIdentity {
        VisitorIdentity {
            id: "80351110224678912".to_string(),
            username: "nelly".to_string(),
            avatar: Some("8342729096ea3675442027381ff50dfe".to_string()),
        }
    }

    #[test]
    fn test_issue_and_verify() {
        let tokens = tokens("k3Y!9vQ#2mZ@7xW$4pL&8nR^1sT*6uB%");
        let token = tokens.issue(&visitor()).unwrap();
        assert_eq!(tokens.verify(&token).unwrap(), visitor());
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = tokens("k3Y!9vQ#2mZ@7xW$4pL&8nR^1sT*6uB%")
            .issue(&visitor())
            .unwrap();
        assert!(tokens("a-completely-different-signing-key").verify(&token).is_err());
    }

    #[test]
    fn test_expired_token_rejected() {
        let tokens = tokens("k3Y!9vQ#2mZ@7xW$4pL&8nR^1sT*6uB%");
        let issued_long_ago = Utc::now() - VISITOR_TOKEN_TTL - Duration::minutes(1);
        let token = tokens.issue_at(&visitor(), issued_long_ago).unwrap();
        assert!(matches!(
            tokens.verify(&token),
            Err(VisitorTokenError::Invalid(_))
        ));
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(tokens("k3Y!9vQ#2mZ@7xW$4pL&8nR^1sT*6uB%").verify("not.a.jwt").is_err());
    }
}
