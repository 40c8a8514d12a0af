//! Trusted-tier execution of one remote call.

use std::future::Future;
use std::sync::Arc;

use serde::Serialize;

use portal_remote::CallContext;
use portal_session::{CredentialStore, StoreError};
use portal_types::{
    ClientMetadata, Credential, Envelope, MessageOverrides, PlainEnvelope, RemoteError, classify,
};

use crate::codec::encode;

pub const DEFAULT_SESSION_SIGNATURES: [&str; 3] =
    ["session not found", "session expired", "session revoked"];

/// Remote failure messages that mean the stored credential is no longer valid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSignatures(Vec<String>);

impl Default for SessionSignatures {
    fn default() -> Self {
        Self::new(DEFAULT_SESSION_SIGNATURES)
    }
}

impl SessionSignatures {
    pub fn new<I, S>(signatures: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(
            signatures
                .into_iter()
                .map(|s| s.as_ref().trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect(),
        )
    }

    #[must_use]
    pub fn matches(&self, raw_message: &str) -> bool {
        let candidate = raw_message.trim().to_lowercase();
        self.0.iter().any(|signature| *signature == candidate)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionOptions {
    pub credential_required: bool,
    pub overrides: MessageOverrides,
}

impl ActionOptions {
    #[must_use]
    pub fn authenticated() -> Self {
        Self {
            credential_required: true,
            overrides: MessageOverrides::default(),
        }
    }

    #[must_use]
    pub fn public() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_overrides(mut self, overrides: MessageOverrides) -> Self {
        self.overrides = overrides;
        self
    }
}

/// Attaches the stored credential and inbound metadata to a remote call and
/// reduces its outcome to an envelope.
///
/// This is the only place a remote failure evicts the stored credential.
pub struct ActionExecutor {
    store: Arc<dyn CredentialStore>,
    metadata: ClientMetadata,
    signatures: SessionSignatures,
}

impl std::fmt::Debug for ActionExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionExecutor")
            .field("metadata", &self.metadata)
            .field("signatures", &self.signatures)
            .finish_non_exhaustive()
    }
}

impl ActionExecutor {
    pub fn new(store: Arc<dyn CredentialStore>, metadata: ClientMetadata) -> Self {
        Self {
            store,
            metadata,
            signatures: SessionSignatures::default(),
        }
    }

    #[must_use]
    pub fn with_signatures(mut self, signatures: SessionSignatures) -> Self {
        self.signatures = signatures;
        self
    }

    pub async fn execute<T, F, Fut>(&self, options: &ActionOptions, call: F) -> PlainEnvelope
    where
        T: Serialize,
        F: FnOnce(CallContext) -> Fut,
        Fut: Future<Output = Result<T, RemoteError>>,
    {
        let token = if options.credential_required {
            match self.store.get() {
                Ok(token) => Some(token),
                Err(e) => {
                    tracing::debug!(error = %e, "No usable credential; remote call skipped");
                    let error = classify(&RemoteError::from(e));
                    return Envelope::failure(error).with_overrides(&options.overrides);
                }
            }
        } else {
            None
        };

        let envelope = encode(call(CallContext::new(token, self.metadata.clone()))).await;

        if let Some(error) = envelope.error() {
            tracing::debug!(
                code = %error.code,
                retryable = error.code.is_retryable(),
                "Action failed"
            );
            if self.signatures.matches(&error.raw_message) {
                tracing::warn!(
                    code = %error.code,
                    "Remote rejected the session; clearing credential"
                );
                if let Err(e) = self.store.clear() {
                    tracing::warn!(error = %e, "Failed to clear rejected credential");
                }
            }
        }

        envelope.with_overrides(&options.overrides)
    }

    /// Persist a freshly issued credential.
    pub fn sign_in(&self, credential: &Credential) -> Result<(), StoreError> {
        self.store.set(credential)?;
        tracing::debug!(expires_at = %credential.expires_at, "Session stored");
        Ok(())
    }

    pub fn sign_out(&self) -> Result<(), StoreError> {
        self.store.clear()
    }

    #[must_use]
    pub fn has_session(&self) -> bool {
        self.store.has_session()
    }
}
