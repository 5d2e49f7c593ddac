//! Error types for the download module.
//!
//! This module defines structured errors for all transfer operations,
//! providing context-rich error messages for debugging and user feedback.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors that can occur while transferring a single file.
#[derive(Debug, Error)]
pub enum TransferError {
    /// Network-level error (DNS resolution, connection refused, TLS errors, etc.)
    #[error("network error downloading {url}: {source}")]
    Network {
        /// The URL that failed to download.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// Request timed out before completion.
    #[error("timeout downloading {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// The file does not exist on the server (HTTP 404).
    #[error("file not found at {url} (HTTP 404)")]
    NotFound {
        /// The URL that returned 404.
        url: String,
    },

    /// The server refused access (HTTP 401 or 403).
    #[error("access denied for {url} (HTTP {status})")]
    AccessDenied {
        /// The URL that was refused.
        url: String,
        /// The HTTP status code (401 or 403).
        status: u16,
    },

    /// The destination device ran out of space while writing.
    #[error("not enough storage space writing {path}")]
    StorageExhausted {
        /// The file path that could not be written.
        path: PathBuf,
    },

    /// The server returned a payload in a format the player cannot decode (HTTP 415).
    #[error("unsupported media format from {url}")]
    Decode {
        /// The URL that served the unsupported payload.
        url: String,
    },

    /// Any other HTTP error response (4xx client errors, 5xx server errors).
    #[error("HTTP {status} downloading {url}")]
    HttpStatus {
        /// The URL that returned an error status.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// File system error during download (create file, write, etc.)
    #[error("IO error writing to {path}: {source}")]
    Io {
        /// The file path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The provided URL is malformed or invalid.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The invalid URL string.
        url: String,
    },
}

impl TransferError {
    /// Creates a network error from a reqwest error, mapping timeouts to
    /// [`TransferError::Timeout`].
    pub fn from_reqwest(url: impl Into<String>, source: reqwest::Error) -> Self {
        let url = url.into();
        if source.is_timeout() {
            Self::Timeout { url }
        } else {
            Self::Network { url, source }
        }
    }

    /// Creates an IO error, mapping full-device failures to
    /// [`TransferError::StorageExhausted`].
    pub fn from_io(path: &Path, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::StorageFull {
            Self::StorageExhausted {
                path: path.to_path_buf(),
            }
        } else {
            Self::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    }
}

/// Classifies a non-success HTTP status code into the error taxonomy.
#[must_use]
pub fn classify_status(url: &str, status: u16) -> TransferError {
    let url = url.to_string();
    match status {
        404 => TransferError::NotFound { url },
        401 | 403 => TransferError::AccessDenied { url, status },
        408 => TransferError::Timeout { url },
        415 => TransferError::Decode { url },
        _ => TransferError::HttpStatus { url, status },
    }
}
