//! Client identity for lockout accounting.
//!
//! The server normally sits behind Cloudflare and Fly.io, so the socket peer is
//! a proxy. The real client address is taken from proxy headers first.
//!
//! Clients can set those headers themselves. Trusting them is only safe when
//! every request passes through a proxy that overwrites them; otherwise set
//! `STUDIO_TRUST_PROXY_HEADERS=false` and the socket peer is used.

use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::{HeaderMap, request::Parts};

use crate::state::AppState;

/// Identity used when no address can be determined.
pub const UNKNOWN_IDENTITY: &str = "unknown";

/// The network origin of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIdentity(pub String);

impl ClientIdentity {
    /// Borrow the identity string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ClientIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Real client IP from proxy headers, in trust order:
/// `CF-Connecting-IP`, first `X-Forwarded-For` hop, `X-Real-IP`, `Fly-Client-IP`.
#[must_use]
pub fn client_ip_from_headers(headers: &HeaderMap) -> Option<IpAddr> {
    let header_ip = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse::<IpAddr>().ok())
    };

    header_ip("cf-connecting-ip")
        .or_else(|| {
            headers
                .get("x-forwarded-for")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.split(',').next())
                .and_then(|s| s.trim().parse::<IpAddr>().ok())
        })
        .or_else(|| header_ip("x-real-ip"))
        .or_else(|| header_ip("fly-client-ip"))
}

impl ClientIdentity {
    /// Resolve the identity of a request, consulting proxy headers only when
    /// `trust_proxy_headers` is set.
    #[must_use]
    pub fn resolve(parts: &Parts, trust_proxy_headers: bool) -> Self {
        let from_headers = if trust_proxy_headers {
            client_ip_from_headers(&parts.headers)
        } else {
            None
        };
        let ip = from_headers.or_else(|| {
            parts
                .extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip())
        });

        Self(ip.map_or_else(|| UNKNOWN_IDENTITY.to_string(), |ip| ip.to_string()))
    }
}

impl FromRequestParts<AppState> for ClientIdentity {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(Self::resolve(parts, state.config().trust_proxy_headers))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::{HeaderValue, Request};

    use super::*;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn test_cloudflare_header_wins() {
        let map = headers(&[
            ("x-forwarded-for", "198.51.100.1"),
            ("cf-connecting-ip", "203.0.113.7"),
        ]);
        assert_eq!(
            client_ip_from_headers(&map),
            Some("203.0.113.7".parse().unwrap())
        );
    }

    #[test]
    fn test_first_forwarded_hop() {
        let map = headers(&[("x-forwarded-for", " 198.51.100.1 , 10.0.0.1")]);
        assert_eq!(
            client_ip_from_headers(&map),
            Some("198.51.100.1".parse().unwrap())
        );
    }

    #[test]
    fn test_garbage_header_skipped() {
        let map = headers(&[("cf-connecting-ip", "nonsense"), ("fly-client-ip", "2001:db8::1")]);
        assert_eq!(
            client_ip_from_headers(&map),
            Some("2001:db8::1".parse().unwrap())
        );
    }

    fn parts_from_peer(forwarded_for: &'static str) -> Parts {
        let mut req = Request::builder()
            .header("x-forwarded-for", forwarded_for)
            .body(())
            .unwrap();
        req.extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([192, 0, 2, 9], 5555))));
        req.into_parts().0
    }

    #[test]
    fn test_falls_back_to_peer_then_unknown() {
        let mut req = Request::builder().body(()).unwrap();
        req.extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([192, 0, 2, 9], 5555))));
        let (parts, ()) = req.into_parts();
        assert_eq!(ClientIdentity::resolve(&parts, true).as_str(), "192.0.2.9");

        let (parts, ()) = Request::builder().body(()).unwrap().into_parts();
        assert_eq!(ClientIdentity::resolve(&parts, true).as_str(), UNKNOWN_IDENTITY);
    }

    #[test]
    fn test_trusted_headers_used() {
        let parts = parts_from_peer("198.51.100.1");
        assert_eq!(ClientIdentity::resolve(&parts, true).as_str(), "198.51.100.1");
    }

    #[test]
    fn test_untrusted_headers_ignored() {
        // Rotating the header must not mint a new identity.
        for spoofed in ["198.51.100.1", "198.51.100.2"] {
            let parts = parts_from_peer(spoofed);
            assert_eq!(ClientIdentity::resolve(&parts, false).as_str(), "192.0.2.9");
        }
    }
}
