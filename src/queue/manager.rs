//! Sequential download queue with retry, pause/resume, and status broadcast.
//!
//! The queue processes one job at a time: the underlying transfer path
//! supports only one live progress subscription, and sequential writes keep
//! the storage subsystem from thrashing. An `is_processing` flag guards the
//! loop against reentrancy, which substitutes for a mutex around the loop
//! itself in this one-loop-at-a-time model.
//!
//! # Retry behavior
//!
//! Every transfer failure is retried after a fixed delay until the attempt
//! budget is spent, and a retried job re-enters at the *head* of the queue,
//! ahead of jobs submitted after its failure. Fast-tracking likely-transient
//! failures is intentional, with a known trade-off: a job that keeps failing
//! just under the retry ceiling delays later jobs by up to
//! `max_retries * retry_delay`.
//!
//! # Cancellation
//!
//! Only pending jobs can be cancelled. The transfer path exposes no
//! cancellation token, so the active job always runs to completion or
//! exhausts its own retries.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use super::error::QueueError;
use super::job::{CompletedDownload, Job, JobState, QueueSnapshot, TrackRequest, TransferProgress};
use crate::download::{INTER_JOB_DELAY, MAX_RETRIES, RETRY_DELAY, Transfer};

/// Tunables for retry and pacing behavior.
///
/// The defaults are the production values; tests shrink the delays.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Maximum transfer attempts per job, including the first one.
    pub max_retries: u32,
    /// Fixed wait before a failed job is retried.
    pub retry_delay: Duration,
    /// Pause between jobs (not between retry attempts of the same job).
    pub inter_job_delay: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_retries: MAX_RETRIES,
            retry_delay: RETRY_DELAY,
            inter_job_delay: INTER_JOB_DELAY,
        }
    }
}

/// Caller-side handle for one queued download.
///
/// Progress arrives over an unbounded channel; completion resolves once with
/// the download result or the classified failure.
pub struct DownloadHandle {
    job_id: String,
    progress: mpsc::UnboundedReceiver<TransferProgress>,
    done: oneshot::Receiver<Result<CompletedDownload, QueueError>>,
}

impl DownloadHandle {
    /// The id of the job this handle tracks.
    #[must_use]
    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// Receives the next progress tick; `None` once the transfer is over.
    pub async fn recv_progress(&mut self) -> Option<TransferProgress> {
        self.progress.recv().await
    }

    /// Waits for the job to finish.
    pub async fn wait(self) -> Result<CompletedDownload, QueueError> {
        self.done.await.unwrap_or(Err(QueueError::Shutdown))
    }

    /// Splits the handle for callers that select over progress and
    /// completion concurrently.
    #[must_use]
    pub fn into_parts(
        self,
    ) -> (
        String,
        mpsc::UnboundedReceiver<TransferProgress>,
        oneshot::Receiver<Result<CompletedDownload, QueueError>>,
    ) {
        (self.job_id, self.progress, self.done)
    }
}

/// A job waiting in the queue, with the channels back to its handle.
struct QueuedJob {
    track: TrackRequest,
    retry_count: u32,
    progress_tx: mpsc::UnboundedSender<TransferProgress>,
    done_tx: oneshot::Sender<Result<CompletedDownload, QueueError>>,
}

impl QueuedJob {
    fn new(track: TrackRequest) -> (DownloadHandle, Self) {
        let (progress_tx, progress_rx) = mpsc::unbounded_channel();
        let (done_tx, done_rx) = oneshot::channel();
        let handle = DownloadHandle {
            job_id: track.id.clone(),
            progress: progress_rx,
            done: done_rx,
        };
        let job = Self {
            track,
            retry_count: 0,
            progress_tx,
            done_tx,
        };
        (handle, job)
    }
}

#[derive(Default)]
struct State {
    pending: VecDeque<QueuedJob>,
    active: Option<Job>,
    is_processing: bool,
    is_paused: bool,
    total_completed: u64,
    total_failed: u64,
    status_tx: Option<mpsc::UnboundedSender<QueueSnapshot>>,
}

impl State {
    fn is_duplicate(&self, source_url: &str) -> bool {
        self.pending
            .iter()
            .any(|q| q.track.source_url == source_url)
            || self
                .active
                .as_ref()
                .is_some_and(|a| a.track.source_url == source_url)
    }

    fn snapshot(&self) -> QueueSnapshot {
        QueueSnapshot {
            pending_count: self.pending.len(),
            active_job: self.active.clone(),
            is_paused: self.is_paused,
            total_completed: self.total_completed,
            total_failed: self.total_failed,
        }
    }

    /// Sends a fresh snapshot to the subscriber, if any. A hung-up
    /// subscriber is dropped.
    fn emit(&mut self) {
        let snapshot = self.snapshot();
        if let Some(tx) = &self.status_tx
            && tx.send(snapshot).is_err()
        {
            self.status_tx = None;
        }
    }
}

struct Inner {
    worker: Arc<dyn Transfer>,
    config: QueueConfig,
    state: Mutex<State>,
}

impl Inner {
    fn lock_state(&self) -> MutexGuard<'_, State> {
        // A poisoned lock means a panic under a short critical section;
        // the state itself stays coherent
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// The sequential download queue.
///
/// Owns the FIFO of pending jobs, the single active slot, the retry policy,
/// pause/resume, cancellation, and status broadcasting. All state lives in
/// this one object; construct it explicitly and hand it to whatever layer
/// consumes the callbacks.
///
/// Must be used within a Tokio runtime: mutating operations spawn the
/// processing loop as a task.
pub struct DownloadQueue {
    inner: Arc<Inner>,
}

impl DownloadQueue {
    /// Creates a queue that transfers through `worker`.
    #[must_use]
    pub fn new(worker: Arc<dyn Transfer>, config: QueueConfig) -> Self {
        debug!(
            max_retries = config.max_retries,
            retry_delay_ms = config.retry_delay.as_millis(),
            inter_job_delay_ms = config.inter_job_delay.as_millis(),
            "creating download queue"
        );
        Self {
            inner: Arc::new(Inner {
                worker,
                config,
                state: Mutex::new(State::default()),
            }),
        }
    }

    /// Appends a track to the queue and starts processing if idle.
    ///
    /// The duplicate check runs synchronously: a track whose `source_url`
    /// matches a pending or active job is rejected with
    /// [`QueueError::Duplicate`] and queue state is left unchanged.
    pub fn add_to_queue(&self, track: TrackRequest) -> Result<DownloadHandle, QueueError> {
        let mut st = self.inner.lock_state();
        if st.is_duplicate(&track.source_url) {
            warn!(job_id = %track.id, url = %track.source_url, "duplicate submission rejected");
            return Err(QueueError::Duplicate {
                source_url: track.source_url,
            });
        }

        let (handle, job) = QueuedJob::new(track);
        st.pending.push_back(job);
        info!(
            job_id = %handle.job_id,
            pending = st.pending.len(),
            "track added to queue"
        );
        st.emit();
        self.maybe_start(st);
        Ok(handle)
    }

    /// Resubmits a track manually, typically after permanent failure.
    ///
    /// Any queued entry with the same job id is displaced (its handle
    /// resolves as cancelled), the retry count starts over at 0, and the
    /// track enters at the *head* of the queue.
    pub fn retry_download(&self, track: TrackRequest) -> DownloadHandle {
        let mut st = self.inner.lock_state();
        if let Some(pos) = st.pending.iter().position(|q| q.track.id == track.id)
            && let Some(displaced) = st.pending.remove(pos)
        {
            let _ = displaced.done_tx.send(Err(QueueError::Cancelled));
        }

        let (handle, job) = QueuedJob::new(track);
        st.pending.push_front(job);
        info!(job_id = %handle.job_id, "manual retry queued at head");
        st.emit();
        self.maybe_start(st);
        handle
    }

    /// Removes a pending job. Returns whether one was found.
    ///
    /// The active job cannot be cancelled: the transfer path has no
    /// cancellation token, so an in-flight transfer always runs to
    /// completion or exhausts its retries.
    pub fn cancel(&self, job_id: &str) -> bool {
        let mut st = self.inner.lock_state();
        let Some(pos) = st.pending.iter().position(|q| q.track.id == job_id) else {
            debug!(job_id, "cancel: no pending job with that id");
            return false;
        };
        if let Some(job) = st.pending.remove(pos) {
            info!(job_id, "pending download cancelled");
            let _ = job.done_tx.send(Err(QueueError::Cancelled));
        }
        st.emit();
        true
    }

    /// Cancels every pending job, leaving the active one running.
    pub fn clear_queue(&self) {
        let mut st = self.inner.lock_state();
        let cleared = st.pending.len();
        for job in st.pending.drain(..) {
            let _ = job.done_tx.send(Err(QueueError::QueueCleared));
        }
        if cleared > 0 {
            info!(cleared, "pending queue cleared");
        }
        st.emit();
    }

    /// Pauses processing. Idempotent; the active job runs to completion.
    pub fn pause(&self) {
        let mut st = self.inner.lock_state();
        if !st.is_paused {
            info!("queue paused");
        }
        st.is_paused = true;
        st.emit();
    }

    /// Resumes processing. Idempotent; restarts the loop only when jobs
    /// remain and it is not already running.
    pub fn resume(&self) {
        let mut st = self.inner.lock_state();
        if st.is_paused {
            info!("queue resumed");
        }
        st.is_paused = false;
        st.emit();
        self.maybe_start(st);
    }

    /// Pull-based status read.
    #[must_use]
    pub fn get_status(&self) -> QueueSnapshot {
        self.inner.lock_state().snapshot()
    }

    /// Push-based status subscription, single-subscriber.
    ///
    /// Last subscriber wins: a new call replaces the previous sender, ending
    /// the old receiver's stream. This is a deliberate simplification for a
    /// single-consumer UI, not a general multicast bus.
    #[must_use]
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<QueueSnapshot> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut st = self.inner.lock_state();
        st.status_tx = Some(tx);
        rx
    }

    /// Zeroes the completed/failed totals.
    pub fn reset_stats(&self) {
        let mut st = self.inner.lock_state();
        st.total_completed = 0;
        st.total_failed = 0;
        st.emit();
    }

    /// Whether the loop is running or jobs are waiting.
    #[must_use]
    pub fn is_active(&self) -> bool {
        let st = self.inner.lock_state();
        st.is_processing || !st.pending.is_empty()
    }

    /// Number of jobs waiting in the queue.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.inner.lock_state().pending.len()
    }

    /// Starts the processing loop if it is idle, unpaused, and has work.
    fn maybe_start(&self, mut st: MutexGuard<'_, State>) {
        if !st.is_processing && !st.is_paused && !st.pending.is_empty() {
            st.is_processing = true;
            drop(st);
            let inner = Arc::clone(&self.inner);
            tokio::spawn(run_loop(inner));
        }
    }
}

/// The sequential processing loop. At most one instance runs at a time,
/// enforced by the `is_processing` flag.
async fn run_loop(inner: Arc<Inner>) {
    debug!("queue processing started");
    loop {
        let queued = {
            let mut st = inner.lock_state();
            let Some(queued) = (!st.is_paused)
                .then(|| st.pending.pop_front())
                .flatten()
            else {
                st.is_processing = false;
                debug!(
                    paused = st.is_paused,
                    pending = st.pending.len(),
                    completed = st.total_completed,
                    failed = st.total_failed,
                    "queue processing stopped"
                );
                st.emit();
                return;
            };
            st.active = Some(Job {
                track: queued.track.clone(),
                state: JobState::Downloading {
                    progress_percent: 0.0,
                },
            });
            st.emit();
            queued
        };

        let QueuedJob {
            track,
            retry_count,
            progress_tx,
            done_tx,
        } = queued;
        let attempt = retry_count + 1;
        info!(
            job_id = %track.id,
            url = %track.source_url,
            attempt,
            max_attempts = inner.config.max_retries,
            "starting transfer"
        );

        // Ticks update the active job's progress (emitting a snapshot per
        // tick) before being forwarded to the caller's handle
        let (tick_tx, mut tick_rx) = mpsc::unbounded_channel::<TransferProgress>();
        let fwd_inner = Arc::clone(&inner);
        let fwd_tx = progress_tx.clone();
        let forwarder = tokio::spawn(async move {
            while let Some(tick) = tick_rx.recv().await {
                {
                    let mut st = fwd_inner.lock_state();
                    let mine = st
                        .active
                        .as_mut()
                        .filter(|active| active.track.id == tick.job_id);
                    if let Some(active) = mine {
                        active.state = JobState::Downloading {
                            progress_percent: tick.percentage,
                        };
                        st.emit();
                    }
                }
                let _ = fwd_tx.send(tick);
            }
        });

        let result = inner.worker.transfer(&track, tick_tx).await;
        // The worker dropped its sender; let the forwarder drain before the
        // terminal snapshot
        let _ = forwarder.await;

        let mut job_finished = true;
        match result {
            Ok(done) => {
                info!(
                    job_id = %track.id,
                    path = %done.file_path.display(),
                    file_size = done.file_size,
                    "download completed"
                );
                let mut st = inner.lock_state();
                if let Some(active) = st.active.as_mut() {
                    active.state = JobState::Completed {
                        result: done.clone(),
                    };
                }
                st.emit();
                st.active = None;
                st.total_completed += 1;
                st.emit();
                drop(st);
                let _ = done_tx.send(Ok(done));
            }
            Err(error) if attempt < inner.config.max_retries => {
                warn!(
                    job_id = %track.id,
                    attempt,
                    max_attempts = inner.config.max_retries,
                    error = %error,
                    retry_delay_ms = inner.config.retry_delay.as_millis(),
                    "transfer failed; retrying"
                );
                {
                    let mut st = inner.lock_state();
                    if let Some(active) = st.active.as_mut() {
                        active.state = JobState::Pending {
                            retry_count: attempt,
                        };
                    }
                    st.emit();
                }
                tokio::time::sleep(inner.config.retry_delay).await;
                let mut st = inner.lock_state();
                st.active = None;
                // Retry jumps the queue: reinsert at the head, ahead of jobs
                // submitted after the failure
                st.pending.push_front(QueuedJob {
                    track,
                    retry_count: attempt,
                    progress_tx,
                    done_tx,
                });
                st.emit();
                job_finished = false;
            }
            Err(error) => {
                let message = format!("download failed after {attempt} attempts: {error}");
                warn!(
                    job_id = %track.id,
                    attempts = attempt,
                    error = %error,
                    "download failed permanently"
                );
                let mut st = inner.lock_state();
                if let Some(active) = st.active.as_mut() {
                    active.state = JobState::Failed {
                        error: message,
                        attempts: attempt,
                    };
                }
                st.emit();
                st.active = None;
                st.total_failed += 1;
                st.emit();
                drop(st);
                let _ = done_tx.send(Err(QueueError::Exhausted {
                    attempts: attempt,
                    source: error,
                }));
            }
        }

        if job_finished {
            // Pacing applies between jobs, not between retry attempts
            let more_work = {
                let st = inner.lock_state();
                !st.pending.is_empty() && !st.is_paused
            };
            if more_work {
                tokio::time::sleep(inner.config.inter_job_delay).await;
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::download::TransferError;
    use crate::metadata::TrackTags;
    use async_trait::async_trait;

    /// Transfer stub that always succeeds after a short pause.
    struct AlwaysSucceed;

    #[async_trait]
    impl Transfer for AlwaysSucceed {
        async fn transfer(
            &self,
            track: &TrackRequest,
            progress: mpsc::UnboundedSender<TransferProgress>,
        ) -> Result<CompletedDownload, TransferError> {
            let _ = progress.send(TransferProgress {
                job_id: track.id.clone(),
                bytes_downloaded: 10,
                total_bytes: 10,
                percentage: 100.0,
            });
            tokio::time::sleep(Duration::from_millis(10)).await;
            Ok(CompletedDownload {
                file_path: format!("music/{}.mp3", track.id).into(),
                file_size: 10,
                tags: TrackTags::default(),
                album_art: None,
            })
        }
    }

    fn fast_config() -> QueueConfig {
        QueueConfig {
            max_retries: 3,
            retry_delay: Duration::from_millis(20),
            inter_job_delay: Duration::from_millis(5),
        }
    }

    fn track(id: &str, url: &str) -> TrackRequest {
        TrackRequest {
            id: id.to_string(),
            title: format!("Track {id}"),
            source_url: url.to_string(),
        }
    }

    #[test]
    fn test_config_defaults_match_constants() {
        let config = QueueConfig::default();
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.retry_delay, Duration::from_millis(1000));
        assert_eq!(config.inter_job_delay, Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_duplicate_rejected_synchronously_without_state_change() {
        let queue = DownloadQueue::new(Arc::new(AlwaysSucceed), fast_config());
        queue.pause(); // keep both jobs pending so state is easy to inspect

        let _a = queue
            .add_to_queue(track("a", "https://cdn.example.com/a.mp3"))
            .unwrap();
        let before = queue.get_status();

        let dup = queue.add_to_queue(track("a2", "https://cdn.example.com/a.mp3"));
        assert!(matches!(dup, Err(QueueError::Duplicate { .. })));
        assert_eq!(queue.get_status(), before);
        assert_eq!(queue.pending_count(), 1);
    }

    #[tokio::test]
    async fn test_pause_and_resume_are_idempotent() {
        let queue = DownloadQueue::new(Arc::new(AlwaysSucceed), fast_config());

        queue.pause();
        let once = queue.get_status();
        queue.pause();
        assert_eq!(queue.get_status(), once);

        queue.resume();
        let resumed = queue.get_status();
        queue.resume();
        assert_eq!(queue.get_status(), resumed);
        assert!(!resumed.is_paused);
    }

    #[tokio::test]
    async fn test_cancel_unknown_job_returns_false() {
        let queue = DownloadQueue::new(Arc::new(AlwaysSucceed), fast_config());
        assert!(!queue.cancel("nope"));
    }

    #[tokio::test]
    async fn test_subscribe_replaces_previous_subscriber() {
        let queue = DownloadQueue::new(Arc::new(AlwaysSucceed), fast_config());
        let mut first = queue.subscribe();
        let mut second = queue.subscribe();

        queue.pause();
        // The first receiver's stream ends because its sender was replaced
        assert!(first.recv().await.is_none());
        let snapshot = second.recv().await.unwrap();
        assert!(snapshot.is_paused);
    }

    #[tokio::test]
    async fn test_reset_stats_zeroes_totals() {
        let queue = DownloadQueue::new(Arc::new(AlwaysSucceed), fast_config());
        let handle = queue
            .add_to_queue(track("a", "https://cdn.example.com/a.mp3"))
            .unwrap();
        handle.wait().await.unwrap();
        assert_eq!(queue.get_status().total_completed, 1);

        queue.reset_stats();
        let status = queue.get_status();
        assert_eq!(status.total_completed, 0);
        assert_eq!(status.total_failed, 0);
    }
}
