//! Housekeeping for the downloaded-music directory.
//!
//! Helpers the UI layer uses to manage completed downloads: existence
//! checks, deletion, listing, and storage accounting. None of this touches
//! queue state.

use std::io;
use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, info};

/// Returns whether `path` exists and is a regular file.
pub async fn is_downloaded(path: &Path) -> bool {
    fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
}

/// Deletes one downloaded track.
pub async fn delete_track(path: &Path) -> io::Result<()> {
    fs::remove_file(path).await?;
    info!(path = %path.display(), "track deleted");
    Ok(())
}

/// Lists the files in the music directory. A missing directory yields an
/// empty list rather than an error.
pub async fn list_downloaded(music_dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut entries = match fs::read_dir(music_dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };

    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_file() {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}

/// Total bytes used by downloaded tracks.
pub async fn storage_used(music_dir: &Path) -> io::Result<u64> {
    let mut total = 0;
    for path in list_downloaded(music_dir).await? {
        total += fs::metadata(&path).await?.len();
    }
    Ok(total)
}

/// Deletes every downloaded track. Returns how many files were removed.
pub async fn clear_all(music_dir: &Path) -> io::Result<usize> {
    let files = list_downloaded(music_dir).await?;
    let count = files.len();
    for path in &files {
        fs::remove_file(path).await?;
    }
    debug!(count, "cleared all downloads");
    Ok(count)
}

/// Formats a byte count for display: `0 B`, `1.50 KB`, `12.34 MB`, ...
#[must_use]
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 B".to_string();
    }
    let exponent = (bytes.ilog2() / 10).min(UNITS.len() as u32 - 1);
    let value = bytes as f64 / f64::from(1u32 << (10 * exponent)) as f64;
    if exponent == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.2} {}", UNITS[exponent as usize])
    }
}
