//! Cooperative cancellation.
//!
//! The polling host installs a signal handler that calls [`cancel`], and the
//! loop checks [`is_cancelled`] between operations. In-flight database or
//! platform calls are not interrupted.
//!
//! [`cancel`]: CancellationToken::cancel
//! [`is_cancelled`]: CancellationToken::is_cancelled

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Clonable cancellation flag shared between the signal handler and the
/// polling loop.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request termination. Idempotent.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
