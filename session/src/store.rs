use std::path::PathBuf;

use thiserror::Error;

use portal_types::{Credential, ErrorCode, RemoteError, SessionToken};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no active session")]
    Missing,
    #[error("session has expired")]
    Expired,
    #[error("session expiry out of range: {0}")]
    InvalidExpiry(String),
    #[error("session store I/O failed at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("session store encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
}

impl StoreError {
    /// Whether this error means "there is no usable session".
    #[must_use]
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Missing | Self::Expired)
    }
}

/// An absent or expired credential always surfaces as `Unauthenticated`, so
/// every call site has exactly one code to branch on for "no session".
/// Storage faults are not absence and classify as `Internal`.
impl From<StoreError> for RemoteError {
    fn from(error: StoreError) -> Self {
        let code = if error.is_absent() {
            ErrorCode::Unauthenticated
        } else {
            ErrorCode::Internal
        };
        RemoteError::status(code, error.to_string())
    }
}

/// Persistence for the session credential.
///
/// Implementations must write and clear both markers as a unit: the visible
/// marker may never claim a session while the opaque token is absent.
pub trait CredentialStore: Send + Sync {
    /// Persist both markers with the credential's expiry.
    fn set(&self, credential: &Credential) -> Result<(), StoreError>;

    /// Read the opaque token. Fails with [`StoreError::Missing`] or
    /// [`StoreError::Expired`] when there is no usable session.
    fn get(&self) -> Result<SessionToken, StoreError>;

    /// Remove both markers. Idempotent.
    fn clear(&self) -> Result<(), StoreError>;

    /// Read the browser-visible marker.
    fn has_session(&self) -> bool;
}
