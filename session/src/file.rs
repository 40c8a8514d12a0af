//! On-disk credential store for the trusted local tier.
//!
//! Both markers live in one JSON document, so a single atomic rename writes
//! them together and a single unlink clears them together.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use portal_types::{Credential, SessionToken};
use portal_utils::{atomic_write, backup_path, recover_backup, remove_if_exists};

use crate::markers::{CookiePolicy, HAS_SESSION_VALUE};
use crate::{CredentialStore, StoreError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredMarker {
    value: String,
    expires_at: DateTime<Utc>,
    http_only: bool,
    secure: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct SessionDocument {
    #[serde(rename = "session-token")]
    session_token: StoredMarker,
    #[serde(rename = "has-session")]
    has_session: StoredMarker,
}

#[derive(Debug)]
pub struct FileCredentialStore {
    path: PathBuf,
    policy: CookiePolicy,
    // Serializes writers within this process; readers rely on rename atomicity.
    write_lock: Mutex<()>,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>, policy: CookiePolicy) -> Self {
        Self {
            path: path.into(),
            policy,
            write_lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn load(&self) -> Result<SessionDocument, StoreError> {
        recover_backup(&self.path).map_err(|e| self.io_error(e))?;
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(StoreError::Missing),
            Err(e) => return Err(self.io_error(e)),
        };

        serde_json::from_str(&content).map_err(|e| {
            tracing::warn!(
                path = %self.path.display(),
                "Ignoring unreadable session file: {e}"
            );
            StoreError::Missing
        })
    }
}

impl CredentialStore for FileCredentialStore {
    fn set(&self, credential: &Credential) -> Result<(), StoreError> {
        let marker = |value: &str, http_only: bool| StoredMarker {
            value: value.to_string(),
            expires_at: credential.expires_at,
            http_only,
            secure: self.policy.secure,
        };
        let document = SessionDocument {
            session_token: marker(credential.token.as_str(), true),
            has_session: marker(HAS_SESSION_VALUE, false),
        };
        let bytes = serde_json::to_vec_pretty(&document)?;

        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        atomic_write(&self.path, &bytes).map_err(|e| self.io_error(e))?;
        tracing::debug!(
            path = %self.path.display(),
            expires_at = %credential.expires_at,
            "Session file written"
        );
        Ok(())
    }

    fn get(&self) -> Result<SessionToken, StoreError> {
        let document = self.load()?;
        if document.session_token.expires_at <= Utc::now() {
            return Err(StoreError::Expired);
        }
        SessionToken::new(document.session_token.value).map_err(|_| StoreError::Missing)
    }

    fn clear(&self) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        // A leftover backup would otherwise be recovered on the next read.
        remove_if_exists(backup_path(&self.path)).map_err(|e| self.io_error(e))?;
        let removed = remove_if_exists(&self.path).map_err(|e| self.io_error(e))?;
        if removed {
            tracing::debug!(path = %self.path.display(), "Session file removed");
        }
        Ok(())
    }

    fn has_session(&self) -> bool {
        self.load().is_ok_and(|document| {
            document.has_session.value == HAS_SESSION_VALUE
                && document.has_session.expires_at > Utc::now()
        })
    }
}
