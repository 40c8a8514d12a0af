//! Boundary domain types for Portal.
//!
//! This crate contains pure types with no IO, no async, and minimal dependencies:
//! the error code enumeration shared with the remote service, the classified
//! error form, the result envelope and its wire shape, and the session
//! credential. Everything here can be used on either side of the boundary.

// Pedantic lint configuration - these are intentional design choices
#![allow(clippy::missing_errors_doc)] // Result-returning functions are self-explanatory

mod code;
mod credential;
mod envelope;
mod error;
mod metadata;

pub use code::ErrorCode;
pub use credential::{Credential, EmptyTokenError, SessionToken};
pub use envelope::{Envelope, PlainEnvelope};
pub use error::{GENERIC_FAILURE_MESSAGE, MessageOverrides, NormalizedError, RemoteError, classify};
pub use metadata::{ClientMetadata, FORWARDED_FOR_HEADER, REAL_IP_HEADER, USER_AGENT_HEADER};
