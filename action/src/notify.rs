//! User-visible failure notifications.
//!
//! The presentation layer (toasts, banners) lives outside this crate; it
//! plugs in through [`Notifier`].

use std::sync::{Mutex, PoisonError};

use portal_types::ErrorCode;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub code: ErrorCode,
    pub text: String,
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Writes notifications to the log. Default for headless use.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notification: Notification) {
        tracing::warn!(code = %notification.code, "{}", notification.text);
    }
}

/// Queue of pending notifications, drained by whatever renders them.
///
/// Identical pending notifications are deduplicated, so a burst of call sites
/// failing the same way shows one message.
#[derive(Debug, Default)]
pub struct NotificationQueue {
    pending: Mutex<Vec<Notification>>,
}

impl NotificationQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Take all pending notifications, leaving the queue empty.
    #[must_use]
    pub fn drain(&self) -> Vec<Notification> {
        std::mem::take(&mut *self.pending.lock().unwrap_or_else(PoisonError::into_inner))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }
}

impl Notifier for NotificationQueue {
    fn notify(&self, notification: Notification) {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        if !pending.contains(&notification) {
            pending.push(notification);
        }
    }
}
