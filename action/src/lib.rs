//! Server-action boundary for Portal.
//!
//! # Architecture
//!
//! ```text
//! caller -> ActionExecutor::execute -> remote call
//!                 |
//!                 v
//!           codec::encode -> Envelope (crosses to the browser)
//!                 |
//!                 v
//!           CallSite::run -> decode -> retry | on_error(ctx)
//! ```
//!
//! | Side | Component | Notes |
//! |------|-----------|-------|
//! | Trusted | [`ActionExecutor`] | Attaches credential and metadata, evicts rejected sessions |
//! | Both | [`codec`] | `encode`/`decode` between `Result` and [`PlainEnvelope`] |
//! | Calling | [`CallSite`], [`CallPolicy`] | Retry table, NeedsRefresh, notifications |
//! | Calling | [`RefreshDriver`] | Clears NeedsRefresh after a successful probe |
//!
//! Shared mutable state is limited to the credential store and the
//! [`AppContext`] refresh flag.
//!
//! [`PlainEnvelope`]: portal_types::PlainEnvelope

#![allow(clippy::missing_errors_doc)]

mod call_site;
pub mod codec;
mod context;
mod executor;
mod notify;
mod policy;
mod refresh;

pub use call_site::{CallOutcome, CallSite, CallState};
pub use codec::{decode, encode};
pub use context::{AppContext, RefreshFlag};
pub use executor::{ActionExecutor, ActionOptions, DEFAULT_SESSION_SIGNATURES, SessionSignatures};
pub use notify::{LogNotifier, Notification, NotificationQueue, Notifier};
pub use policy::{
    CallPolicy, DEFAULT_CONNECTIVITY_MESSAGE, DEFAULT_MAX_FAILURES, DEFAULT_NOISE_MESSAGES,
    Disposition, MAX_FAILURES_LIMIT, NoticePolicy, RetryPolicy, present_message, should_retry,
};
pub use refresh::{DEFAULT_REFRESH_ATTEMPTS, RefreshDriver};

pub use portal_remote::CallContext;
