//! Error types for queue operations.

use thiserror::Error;

use crate::download::TransferError;

/// Errors surfaced to callers through a job's completion handle or
/// synchronously from queue operations.
#[derive(Debug, Error)]
pub enum QueueError {
    /// A job with the same source URL is already pending or active.
    #[error("track is already in the download queue: {source_url}")]
    Duplicate {
        /// The duplicated source URL.
        source_url: String,
    },

    /// The job was removed from the queue before it started.
    #[error("download cancelled by user")]
    Cancelled,

    /// The whole pending queue was cleared before the job started.
    #[error("download queue cleared")]
    QueueCleared,

    /// Permanent failure: every automatic attempt failed.
    #[error("download failed after {attempts} attempts: {source}")]
    Exhausted {
        /// Total attempts made.
        attempts: u32,
        /// The error from the final attempt.
        #[source]
        source: TransferError,
    },

    /// The queue was dropped before the job finished.
    #[error("download queue shut down before the job finished")]
    Shutdown,
}
