//! Tunefetch Core Library
//!
//! This library provides the media download pipeline for a local music
//! collection: a sequential queue manager that schedules file transfers,
//! retries failures with a fixed delay, guarantees at most one active
//! transfer at a time, and hands completed files to a tag/album-art
//! extractor.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`queue`] - Sequential queue manager, job model, and status broadcast
//! - [`download`] - Transfer worker, streaming HTTP client, progress listener
//! - [`metadata`] - Audio tag and album-art extraction
//! - [`library`] - Housekeeping for the downloaded-music directory

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_precision_loss)]

pub mod download;
pub mod library;
pub mod metadata;
pub mod queue;

// Re-export commonly used types
pub use download::{
    INTER_JOB_DELAY, MAX_RETRIES, ProgressSlot, RETRY_DELAY, Transfer, TransferClient,
    TransferError, TransferWorker, classify_status,
};
pub use metadata::{TagReader, TrackTags};
pub use queue::{
    CompletedDownload, DownloadHandle, DownloadQueue, Job, JobState, QueueConfig, QueueError,
    QueueSnapshot, TrackRequest, TransferProgress,
};
