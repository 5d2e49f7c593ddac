//! File transfer machinery for the download queue.
//!
//! This module performs one transfer at a time on behalf of the queue
//! manager: streaming HTTP downloads to disk, progress forwarding through
//! the single global listener slot, destination filename resolution, and
//! classification of failures into the transfer error taxonomy.

mod client;
mod constants;
mod error;
mod filename;
mod progress;
mod worker;

pub use client::TransferClient;
pub use constants::{
    CONNECT_TIMEOUT_SECS, INTER_JOB_DELAY, MAX_RETRIES, READ_TIMEOUT_SECS, RETRY_DELAY,
};
pub use error::{TransferError, classify_status};
pub use filename::{filename_from_url, resolve_filename};
pub use progress::{ProgressGuard, ProgressSlot};
pub use worker::{Transfer, TransferWorker};
