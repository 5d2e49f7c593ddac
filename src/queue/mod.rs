//! Download queue management.
//!
//! The queue serializes transfers (one active job system-wide), retries
//! failures with a fixed delay, and broadcasts an immutable status snapshot
//! after every state change.

mod error;
mod job;
mod manager;

pub use error::QueueError;
pub use job::{CompletedDownload, Job, JobState, QueueSnapshot, TrackRequest, TransferProgress};
pub use manager::{DownloadHandle, DownloadQueue, QueueConfig};
