//! HTTP client wrapper for streaming track downloads.
//!
//! This module provides the `TransferClient` struct which streams a response
//! body to a destination file, emitting progress through the registered
//! [`ProgressSlot`] listener as chunks arrive.

use std::path::Path;
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::{Client, ClientBuilder};
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, instrument};
use url::Url;

use super::constants::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS};
use super::error::{TransferError, classify_status};
use super::progress::ProgressSlot;

/// HTTP client for downloading files with streaming support.
///
/// This client is designed to be created once and reused for multiple
/// downloads, taking advantage of connection pooling.
#[derive(Debug, Clone)]
pub struct TransferClient {
    client: Client,
}

impl Default for TransferClient {
    fn default() -> Self {
        Self::new()
    }
}

impl TransferClient {
    /// Creates a new HTTP client with default timeouts.
    ///
    /// Default configuration:
    /// - Connect timeout: 30 seconds
    /// - Read timeout: 5 minutes (for large files)
    /// - Gzip decompression: enabled
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails to build with the static
    /// configuration. This should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new() -> Self {
        Self::new_with_timeouts(CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS)
    }

    /// Creates a new HTTP client with explicit timeout values.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails to build with the supplied
    /// timeout configuration.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new_with_timeouts(connect_timeout_secs: u64, read_timeout_secs: u64) -> Self {
        let client = ClientBuilder::new()
            .connect_timeout(Duration::from_secs(connect_timeout_secs))
            .read_timeout(Duration::from_secs(read_timeout_secs))
            .gzip(true)
            .build()
            .expect("failed to build HTTP client with static configuration");
        Self { client }
    }

    /// Downloads `url` to `dest`, streaming the body to disk.
    ///
    /// Every received chunk is reported through `slot`, which forwards it to
    /// whichever progress listener is registered. The destination file is
    /// created (truncating any existing file) before the first byte is
    /// written.
    ///
    /// # Errors
    ///
    /// Returns a [`TransferError`] classified per the taxonomy: network and
    /// timeout failures, HTTP error statuses (404, 401/403, 415, others),
    /// and file system write failures including storage exhaustion.
    #[instrument(level = "debug", skip(self, slot), fields(dest = %dest.display()))]
    pub async fn download_to_file(
        &self,
        url: &str,
        dest: &Path,
        slot: &ProgressSlot,
    ) -> Result<(), TransferError> {
        let parsed = Url::parse(url).map_err(|_| TransferError::InvalidUrl {
            url: url.to_string(),
        })?;

        let response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(|e| TransferError::from_reqwest(url, e))?;

        let status = response.status();
        if !status.is_success() {
            debug!(status = status.as_u16(), "server returned error status");
            return Err(classify_status(url, status.as_u16()));
        }

        let total_bytes = response.content_length().unwrap_or(0);
        debug!(total_bytes, "starting streamed write");

        let file = File::create(dest)
            .await
            .map_err(|e| TransferError::from_io(dest, e))?;
        let mut writer = BufWriter::new(file);
        let mut stream = response.bytes_stream();
        let mut bytes_downloaded: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| TransferError::from_reqwest(url, e))?;
            writer
                .write_all(&chunk)
                .await
                .map_err(|e| TransferError::from_io(dest, e))?;
            bytes_downloaded += chunk.len() as u64;
            slot.emit(bytes_downloaded, total_bytes);
        }

        writer
            .flush()
            .await
            .map_err(|e| TransferError::from_io(dest, e))?;

        debug!(bytes_downloaded, "streamed write complete");
        Ok(())
    }
}
