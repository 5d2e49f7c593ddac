//! The single global progress-listener resource.
//!
//! The underlying transfer path supports only one live progress subscription:
//! a [`ProgressSlot`] holds at most one registered listener, and registering a
//! new one tears down whatever was there before. Without that teardown, stale
//! progress events would be routed to the wrong job.
//!
//! Acquisition is scoped: [`ProgressSlot::register`] returns a
//! [`ProgressGuard`] that clears the slot on drop, so the listener is released
//! on every exit path of a transfer (success, error, or panic unwind).

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::queue::TransferProgress;

struct Listener {
    job_id: String,
    tx: mpsc::UnboundedSender<TransferProgress>,
}

/// Slot holding the single live progress listener.
#[derive(Default)]
pub struct ProgressSlot {
    listener: Mutex<Option<Listener>>,
}

impl ProgressSlot {
    /// Creates an empty slot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener for `job_id`, replacing any previous one.
    ///
    /// The returned guard clears the slot when dropped. A replaced listener
    /// is logged: a transfer should always have released its own listener
    /// before the next one starts.
    pub fn register(
        self: &Arc<Self>,
        job_id: &str,
        tx: mpsc::UnboundedSender<TransferProgress>,
    ) -> ProgressGuard {
        let mut slot = self.lock();
        if let Some(previous) = slot.take() {
            warn!(
                stale_job_id = %previous.job_id,
                job_id,
                "replacing progress listener that was not released"
            );
        }
        *slot = Some(Listener {
            job_id: job_id.to_string(),
            tx,
        });
        debug!(job_id, "progress listener registered");
        ProgressGuard {
            slot: Arc::clone(self),
            job_id: job_id.to_string(),
        }
    }

    /// Forwards a progress tick to the registered listener, if any.
    ///
    /// `total_bytes` is 0 when the server did not report a content length;
    /// the percentage is 0 in that case.
    pub fn emit(&self, bytes_downloaded: u64, total_bytes: u64) {
        let slot = self.lock();
        if let Some(listener) = slot.as_ref() {
            let percentage = if total_bytes > 0 {
                (bytes_downloaded as f64 / total_bytes as f64) * 100.0
            } else {
                0.0
            };
            // A dropped receiver only means the caller stopped watching
            let _ = listener.tx.send(TransferProgress {
                job_id: listener.job_id.clone(),
                bytes_downloaded,
                total_bytes,
                percentage,
            });
        }
    }

    /// Returns whether a listener is currently registered.
    #[must_use]
    pub fn has_listener(&self) -> bool {
        self.lock().is_some()
    }

    fn lock(&self) -> MutexGuard<'_, Option<Listener>> {
        // A poisoned lock only means a panicked sender; the slot stays coherent
        self.listener.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Scoped-acquisition guard for the progress listener.
///
/// Dropping the guard releases the slot, guaranteeing teardown on every
/// exit path of the owning transfer.
pub struct ProgressGuard {
    slot: Arc<ProgressSlot>,
    job_id: String,
}

impl Drop for ProgressGuard {
    fn drop(&mut self) {
        let mut slot = self.slot.lock();
        // Only clear our own registration; a later register() may own the slot now
        if slot.as_ref().is_some_and(|l| l.job_id == self.job_id) {
            *slot = None;
            debug!(job_id = %self.job_id, "progress listener released");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_register_emit_and_release() {
        let slot = Arc::new(ProgressSlot::new());
        let (tx, mut rx) = mpsc::unbounded_channel();

        let guard = slot.register("job-1", tx);
        assert!(slot.has_listener());

        slot.emit(50, 200);
        let tick = rx.recv().await.unwrap();
        assert_eq!(tick.job_id, "job-1");
        assert_eq!(tick.bytes_downloaded, 50);
        assert_eq!(tick.total_bytes, 200);
        assert!((tick.percentage - 25.0).abs() < f64::EPSILON);

        drop(guard);
        assert!(!slot.has_listener());
    }

    #[tokio::test]
    async fn test_emit_without_listener_is_a_no_op() {
        let slot = ProgressSlot::new();
        slot.emit(10, 100);
        assert!(!slot.has_listener());
    }

    #[tokio::test]
    async fn test_register_replaces_previous_listener() {
        let slot = Arc::new(ProgressSlot::new());
        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();

        let _guard1 = slot.register("job-1", tx1);
        let _guard2 = slot.register("job-2", tx2);

        slot.emit(10, 100);
        assert!(rx1.try_recv().is_err(), "stale listener must not see ticks");
        assert_eq!(rx2.recv().await.unwrap().job_id, "job-2");
    }

    #[tokio::test]
    async fn test_unknown_total_reports_zero_percentage() {
        let slot = Arc::new(ProgressSlot::new());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let _guard = slot.register("job-1", tx);

        slot.emit(10, 0);
        let tick = rx.recv().await.unwrap();
        assert_eq!(tick.total_bytes, 0);
        assert!((tick.percentage - 0.0).abs() < f64::EPSILON);
    }
}
