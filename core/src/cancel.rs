//! Level-triggered cancellation flag

use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Notify;

/// A persistent, idempotent "stop" flag shared between tasks.
///
/// Once set it stays set. Only the first [`cancel`](Self::cancel) call
/// performs the unset -> set transition; later calls are no-ops.
#[derive(Debug, Default)]
pub struct CancellationSignal {
    flag: AtomicBool,
    notify: Notify,
}

impl CancellationSignal {
    /// Create an unset signal
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the signal
    ///
    /// Returns `true` only for the call that performed the transition.
    pub fn cancel(&self) -> bool {
        let transitioned = self
            .flag
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if transitioned {
            self.notify.notify_waiters();
        }
        transitioned
    }

    /// Check whether the signal is set
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// Wait until the signal is set
    ///
    /// Resolves immediately if it already is.
    pub async fn cancelled(&self) {
        loop {
            // Register before checking the flag so a concurrent cancel is not missed.
            let notified = self.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}
