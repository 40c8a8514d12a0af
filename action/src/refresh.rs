//! Clears NeedsRefresh once a probe action succeeds again.

use std::future::Future;

use portal_types::{ErrorCode, NormalizedError, PlainEnvelope};

use crate::context::AppContext;
use crate::policy::RetryPolicy;

pub const DEFAULT_REFRESH_ATTEMPTS: u32 = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct RefreshDriver {
    pub backoff: RetryPolicy,
    pub max_attempts: u32,
}

impl Default for RefreshDriver {
    fn default() -> Self {
        Self {
            backoff: RetryPolicy::default(),
            max_attempts: DEFAULT_REFRESH_ATTEMPTS,
        }
    }
}

impl RefreshDriver {
    /// Probe until success, then resume paused call sites.
    ///
    /// Gives up after `max_attempts`, or immediately on `unauthenticated`:
    /// with no session left there is nothing to refresh. The flag stays set
    /// on failure.
    pub async fn run<F, Fut>(&self, ctx: &AppContext, mut probe: F) -> Result<(), NormalizedError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = PlainEnvelope>,
    {
        let mut last_error = None;
        for attempt in 0..self.max_attempts {
            match probe().await.into_result() {
                Ok(_) => {
                    ctx.complete_refresh();
                    return Ok(());
                }
                Err(error) if error.code == ErrorCode::Unauthenticated => {
                    tracing::warn!("Session is gone; refresh abandoned");
                    return Err(error);
                }
                Err(error) => {
                    tracing::debug!(code = %error.code, attempt, "Refresh probe failed");
                    last_error = Some(error);
                }
            }
            if attempt + 1 < self.max_attempts {
                tokio::time::sleep(self.backoff.retry_delay(attempt)).await;
            }
        }

        Err(last_error.unwrap_or_else(|| {
            NormalizedError::new(ErrorCode::Unknown, "refresh was not attempted")
        }))
    }
}
