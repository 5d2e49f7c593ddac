//! Transfer worker: performs one file transfer end to end.
//!
//! The worker owns the whole lifecycle of a single transfer: destination
//! directory creation, filename resolution, acquisition of the single global
//! progress listener, the streamed download itself, the post-download stat,
//! and tag extraction. The listener is held through an RAII guard so it is
//! released on every exit path before the next transfer may start.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::fs;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument};

use super::client::TransferClient;
use super::error::TransferError;
use super::filename::resolve_filename;
use super::progress::ProgressSlot;
use crate::metadata::TagReader;
use crate::queue::{CompletedDownload, TrackRequest, TransferProgress};

/// One file transfer, start to finish.
///
/// The seam between the queue manager and the transfer machinery: the
/// manager calls exactly one implementation for exactly one job at a time,
/// and tests substitute scripted implementations.
#[async_trait]
pub trait Transfer: Send + Sync {
    /// Transfers `track` to local storage, forwarding progress ticks to
    /// `progress`, and returns the written file with its extracted tags.
    async fn transfer(
        &self,
        track: &TrackRequest,
        progress: mpsc::UnboundedSender<TransferProgress>,
    ) -> Result<CompletedDownload, TransferError>;
}

/// HTTP-backed [`Transfer`] implementation writing into a music directory.
pub struct TransferWorker {
    client: TransferClient,
    slot: Arc<ProgressSlot>,
    music_dir: PathBuf,
    tag_reader: TagReader,
}

impl TransferWorker {
    /// Creates a worker that downloads into `music_dir`.
    ///
    /// The directory is created lazily on the first transfer.
    #[must_use]
    pub fn new(music_dir: impl Into<PathBuf>) -> Self {
        Self {
            client: TransferClient::new(),
            slot: Arc::new(ProgressSlot::new()),
            music_dir: music_dir.into(),
            tag_reader: TagReader::new(),
        }
    }

    /// Creates a worker with an explicit client, for timeout-tuned setups.
    #[must_use]
    pub fn with_client(music_dir: impl Into<PathBuf>, client: TransferClient) -> Self {
        Self {
            client,
            slot: Arc::new(ProgressSlot::new()),
            music_dir: music_dir.into(),
            tag_reader: TagReader::new(),
        }
    }

    /// The directory transfers are written into.
    #[must_use]
    pub fn music_dir(&self) -> &std::path::Path {
        &self.music_dir
    }

    /// The progress-listener slot owned by this worker.
    ///
    /// Exposed so callers can observe listener occupancy; only one listener
    /// is ever live, and only for the duration of one transfer.
    #[must_use]
    pub fn progress_slot(&self) -> &Arc<ProgressSlot> {
        &self.slot
    }
}

#[async_trait]
impl Transfer for TransferWorker {
    #[instrument(level = "debug", skip(self, progress), fields(job_id = %track.id, url = %track.source_url))]
    async fn transfer(
        &self,
        track: &TrackRequest,
        progress: mpsc::UnboundedSender<TransferProgress>,
    ) -> Result<CompletedDownload, TransferError> {
        // Idempotent: an existing directory is not an error
        fs::create_dir_all(&self.music_dir)
            .await
            .map_err(|e| TransferError::from_io(&self.music_dir, e))?;

        let filename = resolve_filename(&track.source_url, &track.id);
        let dest = self.music_dir.join(&filename);
        debug!(filename = %filename, "resolved destination");

        // The guard tears down any stale listener and releases ours on every
        // exit path, including the ? returns below
        let guard = self.slot.register(&track.id, progress);
        let download = self
            .client
            .download_to_file(&track.source_url, &dest, &self.slot)
            .await;
        drop(guard);
        download?;

        let stat = fs::metadata(&dest)
            .await
            .map_err(|e| TransferError::from_io(&dest, e))?;
        let bytes = fs::read(&dest)
            .await
            .map_err(|e| TransferError::from_io(&dest, e))?;
        let (tags, album_art) = self.tag_reader.extract(&bytes);

        info!(
            file_size = stat.len(),
            has_art = album_art.is_some(),
            title = tags.title.as_deref().unwrap_or(&track.title),
            "transfer complete"
        );

        Ok(CompletedDownload {
            file_path: dest,
            file_size: stat.len(),
            tags,
            album_art,
        })
    }
}
