//! Shared state for every call site in one application instance.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::notify::{LogNotifier, Notifier};

/// "A session refresh is pending; hold credential-dependent calls."
///
/// Writes are idempotent: setting an already-set flag is a no-op, so
/// concurrent writers need no lock.
#[derive(Debug, Default)]
pub struct RefreshFlag(AtomicBool);

impl RefreshFlag {
    /// Raise the flag. Returns `true` if this call changed it.
    pub fn set(&self) -> bool {
        !self.0.swap(true, Ordering::AcqRel)
    }

    /// Lower the flag. Returns `true` if this call changed it.
    pub fn clear(&self) -> bool {
        self.0.swap(false, Ordering::AcqRel)
    }

    #[must_use]
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Constructed once at startup and shared (by reference or `Arc`) with every
/// call site.
pub struct AppContext {
    needs_refresh: RefreshFlag,
    notifier: Arc<dyn Notifier>,
}

impl fmt::Debug for AppContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppContext")
            .field("needs_refresh", &self.needs_refresh.is_set())
            .finish_non_exhaustive()
    }
}

impl Default for AppContext {
    fn default() -> Self {
        Self::new(Arc::new(LogNotifier))
    }
}

impl AppContext {
    #[must_use]
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self {
            needs_refresh: RefreshFlag::default(),
            notifier,
        }
    }

    #[must_use]
    pub fn needs_refresh(&self) -> bool {
        self.needs_refresh.is_set()
    }

    /// Whether call sites may run. Every query and mutation checks this first.
    #[must_use]
    pub fn enabled(&self) -> bool {
        !self.needs_refresh()
    }

    pub fn request_refresh(&self) {
        if self.needs_refresh.set() {
            tracing::info!("Session refresh requested; pausing dependent calls");
        }
    }

    /// Called by whichever component completed the refresh.
    pub fn complete_refresh(&self) {
        if self.needs_refresh.clear() {
            tracing::info!("Session refresh complete; resuming dependent calls");
        }
    }

    #[must_use]
    pub fn notifier(&self) -> &dyn Notifier {
        self.notifier.as_ref()
    }
}
