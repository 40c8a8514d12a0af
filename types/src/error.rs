//! Raised failures, their classified form, and outward message overrides.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ErrorCode;

/// Message used when a failure carries no text at all.
pub const GENERIC_FAILURE_MESSAGE: &str = "unknown error";

/// A failure raised at the remote-call boundary.
///
/// This is a closed set: classification is a total match rather than probing
/// an arbitrary value for a `code` field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// The remote service rejected the call with a stable code.
    #[error("{code}: {message}")]
    Status { code: ErrorCode, message: String },
    /// The call never produced a classified answer (connect failure, reset, ...).
    #[error("transport error: {0}")]
    Transport(String),
}

impl RemoteError {
    pub fn status(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Status {
            code,
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    #[must_use]
    pub fn code(&self) -> ErrorCode {
        classify(self).code
    }
}

/// Classified failure that crosses the trust boundary.
///
/// `raw_message` is whatever the remote (or transport) said; `message` starts
/// out identical and may be replaced by the calling layer for presentation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(rename_all = "camelCase")]
#[error("{code}: {message}")]
pub struct NormalizedError {
    pub code: ErrorCode,
    pub raw_message: String,
    pub message: String,
}

impl NormalizedError {
    pub fn new(code: ErrorCode, raw_message: impl Into<String>) -> Self {
        let raw_message = raw_message.into();
        Self {
            code,
            message: raw_message.clone(),
            raw_message,
        }
    }

    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }
}

/// Re-raise a decoded failure so it classifies to the same code again.
impl From<NormalizedError> for RemoteError {
    fn from(error: NormalizedError) -> Self {
        RemoteError::Status {
            code: error.code,
            message: error.raw_message,
        }
    }
}

impl From<&RemoteError> for NormalizedError {
    fn from(raised: &RemoteError) -> Self {
        classify(raised)
    }
}

/// Map a raised failure onto its canonical `{code, message}` form.
///
/// Transport failures are always `Unknown`.
#[must_use]
pub fn classify(raised: &RemoteError) -> NormalizedError {
    match raised {
        RemoteError::Status { code, message } => NormalizedError::new(*code, message.as_str()),
        RemoteError::Transport(message) => {
            let message = message.trim();
            if message.is_empty() {
                NormalizedError::new(ErrorCode::Unknown, GENERIC_FAILURE_MESSAGE)
            } else {
                NormalizedError::new(ErrorCode::Unknown, message)
            }
        }
    }
}

/// Per-code replacements for the outward `message` of a failure.
///
/// Overrides never touch `code` or `raw_message`, so retry and eviction logic
/// keep working on the original classification.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageOverrides {
    by_code: HashMap<ErrorCode, String>,
}

impl MessageOverrides {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn on(mut self, code: ErrorCode, message: impl Into<String>) -> Self {
        self.by_code.insert(code, message.into());
        self
    }

    /// Map several codes onto one shared outward message.
    #[must_use]
    pub fn on_any(mut self, codes: &[ErrorCode], message: impl Into<String>) -> Self {
        let message = message.into();
        for code in codes {
            self.by_code.insert(*code, message.clone());
        }
        self
    }

    pub fn apply(&self, error: &mut NormalizedError) {
        if let Some(message) = self.by_code.get(&error.code) {
            error.message.clone_from(message);
        }
    }
}
