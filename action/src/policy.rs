//! Client-side reaction to a terminal failure: retry, refresh, or tell the user.
//!
//! # Retry Policy
//!
//! - Non-retryable codes (see [`ErrorCode::is_retryable`]) never retry
//! - Anything else retries while fewer than four failures preceded it
//! - Backoff: 1s doubling per failure, capped at 30s, with optional down-jitter
//!
//! # Disposition
//!
//! | Code | Effect |
//! |------|--------|
//! | `deadline_exceeded` | raise NeedsRefresh, no notification |
//! | anything else | one notification with the presentable message |

use std::time::Duration;

use portal_types::{ErrorCode, NormalizedError};

use crate::context::AppContext;
use crate::notify::Notification;

pub const DEFAULT_MAX_FAILURES: u32 = 3;
/// Upper bound on `max_failures`; larger settings are treated as this.
pub const MAX_FAILURES_LIMIT: u32 = 10;
pub const DEFAULT_NOISE_MESSAGES: [&str; 2] = ["fetch failed", "Failed to fetch"];
pub const DEFAULT_CONNECTIVITY_MESSAGE: &str =
    "Unable to reach the server. Check your connection and try again.";

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Highest preceding-failure count that still permits a retry.
    pub max_failures: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    /// Down-jitter factor (0.25 = up to 25% shorter). Zero disables jitter.
    pub jitter_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_failures: DEFAULT_MAX_FAILURES,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            jitter_factor: 0.0,
        }
    }
}

impl RetryPolicy {
    /// `failure_count` is the number of failures before this one; the first
    /// failure of a call site is 0.
    #[must_use]
    pub fn should_retry(&self, failure_count: u32, code: ErrorCode) -> bool {
        code.is_retryable() && failure_count <= self.max_failures.min(MAX_FAILURES_LIMIT)
    }

    #[must_use]
    pub fn retry_delay(&self, failure_count: u32) -> Duration {
        let exponent = i32::try_from(failure_count).unwrap_or(i32::MAX);
        let base = self.initial_delay.as_secs_f64() * 2.0_f64.powi(exponent);
        let capped = base.min(self.max_delay.as_secs_f64());

        let jitter_factor = if self.jitter_factor.is_finite() {
            self.jitter_factor.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let jitter = 1.0 - rand::random::<f64>() * jitter_factor;
        Duration::from_secs_f64(capped * jitter)
    }
}

/// [`RetryPolicy::should_retry`] with the default limits.
#[must_use]
pub fn should_retry(failure_count: u32, code: ErrorCode) -> bool {
    RetryPolicy::default().should_retry(failure_count, code)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoticePolicy {
    /// Raw transport messages that mean "the network is down" rather than
    /// anything the user can act on.
    pub noise_messages: Vec<String>,
    pub connectivity_message: String,
}

impl Default for NoticePolicy {
    fn default() -> Self {
        Self {
            noise_messages: DEFAULT_NOISE_MESSAGES.iter().map(ToString::to_string).collect(),
            connectivity_message: DEFAULT_CONNECTIVITY_MESSAGE.to_string(),
        }
    }
}

impl NoticePolicy {
    #[must_use]
    pub fn text_for(&self, error: &NormalizedError) -> String {
        if self.noise_messages.iter().any(|noise| noise == &error.raw_message) {
            return self.connectivity_message.clone();
        }
        present_message(&error.message)
    }
}

/// Capitalize the first letter and end with terminal punctuation.
#[must_use]
pub fn present_message(message: &str) -> String {
    let trimmed = message.trim();
    let mut chars = trimmed.chars();
    let Some(first) = chars.next() else {
        return String::new();
    };

    let mut text: String = first.to_uppercase().chain(chars).collect();
    if !text.ends_with(['.', '!', '?']) {
        text.push('.');
    }
    text
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    RefreshRequested,
    Notified(Notification),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallPolicy {
    pub retry: RetryPolicy,
    pub notices: NoticePolicy,
}

impl CallPolicy {
    /// React to a failure that will not be retried.
    pub fn on_error(&self, ctx: &AppContext, error: &NormalizedError) -> Disposition {
        if error.code == ErrorCode::DeadlineExceeded {
            ctx.request_refresh();
            return Disposition::RefreshRequested;
        }

        let notification = Notification {
            code: error.code,
            text: self.notices.text_for(error),
        };
        ctx.notifier().notify(notification.clone());
        Disposition::Notified(notification)
    }
}
