//! Request-scoped credential store over an HTTP cookie jar.
//!
//! Seed it from the inbound `Cookie` header, let actions read and mutate it,
//! then write [`CookieJarStore::set_cookie_headers`] onto the response.

use std::sync::{Mutex, MutexGuard, PoisonError};

use cookie::{Cookie, CookieJar};
use time::OffsetDateTime;

use portal_types::{Credential, SessionToken};

use crate::markers::{
    CookiePolicy, HAS_SESSION_COOKIE, HAS_SESSION_VALUE, SESSION_TOKEN_COOKIE,
    credential_cookies, is_lapsed, removal_cookies,
};
use crate::{CredentialStore, StoreError};

#[derive(Debug)]
pub struct CookieJarStore {
    // Both markers change inside one critical section.
    jar: Mutex<CookieJar>,
    policy: CookiePolicy,
}

impl CookieJarStore {
    #[must_use]
    pub fn new(policy: CookiePolicy) -> Self {
        Self {
            jar: Mutex::new(CookieJar::new()),
            policy,
        }
    }

    /// Seed the jar with the cookies the browser sent.
    ///
    /// Malformed pairs are skipped; they cannot be markers this store wrote.
    #[must_use]
    pub fn from_cookie_header(header: Option<&str>, policy: CookiePolicy) -> Self {
        let mut jar = CookieJar::new();
        if let Some(header) = header {
            for parsed in Cookie::split_parse(header.to_string()) {
                match parsed {
                    Ok(cookie) => jar.add_original(cookie.into_owned()),
                    Err(e) => tracing::debug!("Skipping malformed inbound cookie: {e}"),
                }
            }
        }
        Self {
            jar: Mutex::new(jar),
            policy,
        }
    }

    /// `Set-Cookie` header values for every marker changed in this scope.
    #[must_use]
    pub fn set_cookie_headers(&self) -> Vec<String> {
        self.lock().delta().map(ToString::to_string).collect()
    }

    fn lock(&self) -> MutexGuard<'_, CookieJar> {
        // The jar is never left half-updated, so a poisoned lock is still usable.
        self.jar.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl CredentialStore for CookieJarStore {
    fn set(&self, credential: &Credential) -> Result<(), StoreError> {
        let [token, marker] = credential_cookies(credential, &self.policy)?;
        let mut jar = self.lock();
        jar.add(token);
        jar.add(marker);
        tracing::debug!(expires_at = %credential.expires_at, "Session markers written");
        Ok(())
    }

    fn get(&self) -> Result<SessionToken, StoreError> {
        let jar = self.lock();
        // A removal cookie left by `clear` has an empty value.
        let cookie = jar
            .get(SESSION_TOKEN_COOKIE)
            .filter(|cookie| !cookie.value().is_empty())
            .ok_or(StoreError::Missing)?;
        if is_lapsed(cookie, OffsetDateTime::now_utc()) {
            return Err(StoreError::Expired);
        }
        SessionToken::new(cookie.value()).map_err(|_| StoreError::Missing)
    }

    fn clear(&self) -> Result<(), StoreError> {
        let [token, marker] = removal_cookies(&self.policy);
        let mut jar = self.lock();
        jar.add(token);
        jar.add(marker);
        tracing::debug!("Session markers cleared");
        Ok(())
    }

    fn has_session(&self) -> bool {
        let jar = self.lock();
        jar.get(HAS_SESSION_COOKIE).is_some_and(|cookie| {
            cookie.value() == HAS_SESSION_VALUE && !is_lapsed(cookie, OffsetDateTime::now_utc())
        })
    }
}
