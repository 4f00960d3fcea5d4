//! Token transports: cookie or bearer header.
//!
//! Both carry the same signed claims; a deployment activates exactly
//! one of them. The transport only decides where the token travels —
//! issuance, validation and access policy are identical either way.

use axum::http::{header, HeaderMap};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

/// Cookie name for the cookie transport.
pub const ACCESS_TOKEN_COOKIE: &str = "access_token";

/// Cookie lifetime. Independent of the token's own expiry: the cookie
/// may outlive the token, in which case validation fails on expiry.
const COOKIE_MAX_AGE_HOURS: i64 = 24;

/// How the client carries its token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenTransport {
    /// `Authorization: Bearer <token>` header.
    Bearer,
    /// HTTP-only `access_token` cookie.
    Cookie {
        /// Set the `Secure` flag (driven by deployment configuration).
        secure: bool,
    },
}

impl TokenTransport {
    /// Read the transport mode from `AUTH_TRANSPORT` / `COOKIE_SECURE`.
    pub fn from_env() -> Self {
        match std::env::var("AUTH_TRANSPORT").as_deref() {
            Ok("cookie") => {
                let secure = std::env::var("COOKIE_SECURE")
                    .map(|v| v == "true" || v == "1")
                    .unwrap_or(false);
                TokenTransport::Cookie { secure }
            }
            _ => TokenTransport::Bearer,
        }
    }

    /// Pull the raw token out of a request, if present.
    pub fn extract(&self, headers: &HeaderMap) -> Option<String> {
        match self {
            TokenTransport::Bearer => headers
                .get(header::AUTHORIZATION)?
                .to_str()
                .ok()?
                .strip_prefix("Bearer ")
                .map(str::to_string),
            TokenTransport::Cookie { .. } => CookieJar::from_headers(headers)
                .get(ACCESS_TOKEN_COOKIE)
                .map(|c| c.value().to_string()),
        }
    }

    /// The cookie delivered on login (cookie transport only).
    pub fn login_cookie(&self, token: &str) -> Option<Cookie<'static>> {
        match self {
            TokenTransport::Bearer => None,
            TokenTransport::Cookie { secure } => Some(
                Cookie::build((ACCESS_TOKEN_COOKIE, token.to_string()))
                    .http_only(true)
                    .same_site(SameSite::Lax)
                    .secure(*secure)
                    .path("/")
                    .max_age(time::Duration::hours(COOKIE_MAX_AGE_HOURS))
                    .build(),
            ),
        }
    }

    /// The removal cookie delivered on logout (cookie transport only).
    ///
    /// Logout clears only this client-held credential; the token itself
    /// stays valid until its natural expiry.
    pub fn removal_cookie(&self) -> Option<Cookie<'static>> {
        match self {
            TokenTransport::Bearer => None,
            TokenTransport::Cookie { secure } => {
                let mut cookie = Cookie::build((ACCESS_TOKEN_COOKIE, ""))
                    .http_only(true)
                    .same_site(SameSite::Lax)
                    .secure(*secure)
                    .path("/")
                    .build();
                cookie.make_removal();
                Some(cookie)
            }
        }
    }
}
