//! Single-slot wake-up signal for the refresh worker
//!
//! Any number of callers may request an immediate scan; requests made before
//! the worker consumes the signal collapse into one wake. The pending flag is
//! the source of truth. `Notify` only shortens the wait, so a leftover permit
//! from an already-consumed trigger is treated as a spurious wake.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::debug;

/// Pending-wake latch shared between the worker and its callers.
#[derive(Debug, Default)]
pub struct TriggerSignal {
    pending: AtomicBool,
    notify: Notify,
}

impl TriggerSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a wake request as pending. Never blocks.
    pub fn trigger(&self) {
        if !self.pending.swap(true, Ordering::AcqRel) {
            self.notify.notify_one();
        }
    }

    /// Whether a wake request is pending.
    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }

    /// Wait until `timeout` elapses or a trigger is pending.
    ///
    /// Returns `true` when a pending trigger ended the wait, including one
    /// that was already pending on entry.
    pub async fn wait_or_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            let notified = self.notify.notified();
            if self.is_pending() {
                return true;
            }
            tokio::select! {
                _ = notified => {
                    if self.is_pending() {
                        return true;
                    }
                    debug!("stale trigger permit, continuing to wait");
                }
                _ = tokio::time::sleep_until(deadline) => {
                    return self.is_pending();
                }
            }
        }
    }

    /// Clear the pending trigger. Only the waiting worker calls this.
    pub fn consume(&self) {
        self.pending.store(false, Ordering::Release);
    }
}

/// Cloneable handle that lets other components request an immediate scan.
#[derive(Debug, Clone)]
pub struct TriggerHandle {
    signal: Arc<TriggerSignal>,
}

impl TriggerHandle {
    pub(crate) fn new(signal: Arc<TriggerSignal>) -> Self {
        Self { signal }
    }

    /// Ask the worker to scan now instead of at the end of its interval.
    pub fn trigger_immediate_refresh(&self) {
        self.signal.trigger();
        crate::metrics::record_trigger();
        debug!("immediate cookie refresh requested");
    }

    /// Whether a request is waiting to be picked up by the worker.
    pub fn is_pending(&self) -> bool {
        self.signal.is_pending()
    }
}
