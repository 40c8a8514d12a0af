//! Session credential storage for Portal.
//!
//! # Architecture
//!
//! A credential is persisted as two cooperating markers (see [`markers`]):
//!
//! | Marker | Visibility | Purpose |
//! |--------|------------|---------|
//! | `session-token` | HTTP-only | The opaque token, read only by the trusted tier |
//! | `has-session` | Browser-readable | Whether a refresh flow is worth attempting |
//!
//! [`CredentialStore`] is the seam the action executor uses. Two backends:
//!
//! - [`CookieJarStore`] - scoped to one inbound HTTP request; mutations become
//!   `Set-Cookie` headers
//! - [`FileCredentialStore`] - a single JSON document on disk for local tools
//!
//! Both write and clear the markers as a unit, so the visible marker never
//! outlives the token it advertises.

mod file;
mod jar;
pub mod markers;
mod store;

pub use file::FileCredentialStore;
pub use jar::CookieJarStore;
pub use markers::{CookiePolicy, HAS_SESSION_COOKIE, SESSION_TOKEN_COOKIE};
pub use store::{CredentialStore, StoreError};
