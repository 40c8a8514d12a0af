//! Per-call-site lifecycle on the calling layer.
//!
//! ```text
//! Idle -> Executing -> Succeeded
//!                   -> FailedRetryable -> Executing
//!                   -> FailedTerminal
//! ```
//!
//! Only `FailedTerminal` reaches [`CallPolicy::on_error`]. A site whose
//! [`AppContext`] is paused for refresh does not execute at all.

use std::future::Future;

use serde::de::DeserializeOwned;

use portal_types::{NormalizedError, PlainEnvelope};

use crate::codec::decode;
use crate::context::AppContext;
use crate::policy::{CallPolicy, Disposition};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallState {
    Idle,
    /// `attempt` is 1 for the first try.
    Executing {
        attempt: u32,
    },
    FailedRetryable {
        failure_count: u32,
    },
    Succeeded,
    FailedTerminal,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CallOutcome<T> {
    Succeeded(T),
    /// NeedsRefresh was set; nothing ran.
    Paused,
    Failed {
        error: NormalizedError,
        disposition: Disposition,
    },
}

impl<T> CallOutcome<T> {
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded(_))
    }
}

#[derive(Debug)]
pub struct CallSite<'a> {
    ctx: &'a AppContext,
    policy: &'a CallPolicy,
    state: CallState,
}

impl<'a> CallSite<'a> {
    #[must_use]
    pub fn new(ctx: &'a AppContext, policy: &'a CallPolicy) -> Self {
        Self {
            ctx,
            policy,
            state: CallState::Idle,
        }
    }

    #[must_use]
    pub const fn state(&self) -> CallState {
        self.state
    }

    /// Drive `attempt` until it succeeds, fails terminally, or the context
    /// pauses between retries.
    pub async fn run<T, F, Fut>(&mut self, mut attempt: F) -> CallOutcome<T>
    where
        T: DeserializeOwned,
        F: FnMut() -> Fut,
        Fut: Future<Output = PlainEnvelope>,
    {
        let mut failure_count: u32 = 0;
        loop {
            if !self.ctx.enabled() {
                self.state = CallState::Idle;
                return CallOutcome::Paused;
            }

            self.state = CallState::Executing {
                attempt: failure_count.saturating_add(1),
            };
            let error = match decode::<T>(attempt().await) {
                Ok(data) => {
                    self.state = CallState::Succeeded;
                    return CallOutcome::Succeeded(data);
                }
                Err(error) => error,
            };

            if self.policy.retry.should_retry(failure_count, error.code) {
                self.state = CallState::FailedRetryable { failure_count };
                let delay = self.policy.retry.retry_delay(failure_count);
                tracing::debug!(
                    code = %error.code,
                    failure_count,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    "Retrying action"
                );
                tokio::time::sleep(delay).await;
                failure_count = failure_count.saturating_add(1);
                continue;
            }

            self.state = CallState::FailedTerminal;
            tracing::warn!(code = %error.code, failure_count, "Action failed terminally");
            let disposition = self.policy.on_error(self.ctx, &error);
            return CallOutcome::Failed { error, disposition };
        }
    }
}
