//! The two cookie-shaped markers that make up a persisted credential.
//!
//! `session-token` carries the opaque token and is HTTP-only, so only the
//! trusted tier can read it. `has-session` is a plain boolean the browser can
//! see; it only answers "is it worth attempting a refresh". Both always carry
//! the same expiry.

use chrono::{DateTime, Utc};
use cookie::{Cookie, SameSite};
use time::OffsetDateTime;

use portal_types::Credential;

use crate::StoreError;

pub const SESSION_TOKEN_COOKIE: &str = "session-token";
pub const HAS_SESSION_COOKIE: &str = "has-session";
pub const HAS_SESSION_VALUE: &str = "true";

/// Attributes applied to both markers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookiePolicy {
    /// Emit `Secure`; on in production.
    pub secure: bool,
    pub path: String,
    pub domain: Option<String>,
}

impl Default for CookiePolicy {
    fn default() -> Self {
        Self {
            secure: true,
            path: "/".to_string(),
            domain: None,
        }
    }
}

impl CookiePolicy {
    /// Development policy: identical except `Secure` is off.
    #[must_use]
    pub fn development() -> Self {
        Self {
            secure: false,
            ..Self::default()
        }
    }

    fn decorate(&self, cookie: &mut Cookie<'static>) {
        cookie.set_path(self.path.clone());
        if let Some(domain) = &self.domain {
            cookie.set_domain(domain.clone());
        }
        cookie.set_secure(self.secure);
        cookie.set_same_site(SameSite::Lax);
    }
}

pub(crate) fn to_offset(at: DateTime<Utc>) -> Result<OffsetDateTime, StoreError> {
    OffsetDateTime::from_unix_timestamp(at.timestamp())
        .map_err(|e| StoreError::InvalidExpiry(e.to_string()))
}

/// Build both markers for `credential`. They are returned together so callers
/// cannot write one without the other.
pub fn credential_cookies(
    credential: &Credential,
    policy: &CookiePolicy,
) -> Result<[Cookie<'static>; 2], StoreError> {
    let expires = to_offset(credential.expires_at)?;

    let mut token = Cookie::new(SESSION_TOKEN_COOKIE, credential.token.as_str().to_string());
    policy.decorate(&mut token);
    token.set_http_only(true);
    token.set_expires(expires);

    let mut marker = Cookie::new(HAS_SESSION_COOKIE, HAS_SESSION_VALUE);
    policy.decorate(&mut marker);
    marker.set_http_only(false);
    marker.set_expires(expires);

    Ok([token, marker])
}

/// Removal cookies (empty value, expiry in the past) for both markers.
#[must_use]
pub fn removal_cookies(policy: &CookiePolicy) -> [Cookie<'static>; 2] {
    [SESSION_TOKEN_COOKIE, HAS_SESSION_COOKIE].map(|name| {
        let mut cookie = Cookie::new(name, "");
        policy.decorate(&mut cookie);
        cookie.set_http_only(name == SESSION_TOKEN_COOKIE);
        cookie.make_removal();
        cookie
    })
}

/// `true` when the cookie carries an expiry at or before `now`.
pub(crate) fn is_lapsed(cookie: &Cookie<'_>, now: OffsetDateTime) -> bool {
    cookie
        .expires_datetime()
        .is_some_and(|expires| expires <= now)
}
