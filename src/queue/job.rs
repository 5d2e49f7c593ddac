//! Job data model and status snapshot types.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::metadata::TrackTags;

/// A request to download one track.
///
/// `source_url` doubles as the de-duplication key: a track whose URL is
/// already pending or active is rejected rather than queued twice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackRequest {
    /// Opaque identifier, unique per job.
    pub id: String,
    /// Display name for logs and UI.
    pub title: String,
    /// The transfer source.
    pub source_url: String,
}

/// One progress tick of the active transfer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferProgress {
    /// The job this tick belongs to.
    pub job_id: String,
    /// Bytes written so far.
    pub bytes_downloaded: u64,
    /// Expected total bytes; 0 when the server reported no content length.
    pub total_bytes: u64,
    /// Completion percentage (0-100); 0 when the total is unknown.
    pub percentage: f64,
}

/// Result of a successfully completed download.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletedDownload {
    /// Where the file was written.
    pub file_path: PathBuf,
    /// Size of the written file in bytes.
    pub file_size: u64,
    /// Tags extracted from the file (empty on parse failure).
    pub tags: TrackTags,
    /// First embedded picture as a `data:` URI, when present.
    pub album_art: Option<String>,
}

/// Lifecycle state of a job.
///
/// Tagged so that illegal combinations (a progress percentage on a pending
/// job, a result on a failed one) are unrepresentable.
///
/// Transitions: `Pending -> Downloading -> {Completed | Pending(retry_count+1)
/// | Failed}`. Manual resubmission takes `Failed -> Pending(retry_count=0)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobState {
    /// Waiting in the queue (or waiting out a retry delay).
    Pending {
        /// Automatic attempts already consumed.
        retry_count: u32,
    },
    /// Currently being transferred.
    Downloading {
        /// Completion percentage (0-100).
        progress_percent: f64,
    },
    /// Terminal: the file is on disk with its extracted tags.
    Completed {
        /// The download result.
        result: CompletedDownload,
    },
    /// Terminal: all automatic attempts are exhausted.
    Failed {
        /// Aggregated failure message naming the underlying cause.
        error: String,
        /// Total attempts made.
        attempts: u32,
    },
}

impl JobState {
    /// Returns whether this state is terminal.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed { .. } | Self::Failed { .. })
    }
}

/// A job as seen by status consumers: the track plus its current state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    /// The track being downloaded.
    pub track: TrackRequest,
    /// Current lifecycle state.
    pub state: JobState,
}

/// Immutable view of queue state, produced fresh after every mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueSnapshot {
    /// Number of jobs waiting in the queue.
    pub pending_count: usize,
    /// The job occupying the single active slot, if any.
    pub active_job: Option<Job>,
    /// Whether processing is paused.
    pub is_paused: bool,
    /// Jobs completed since construction (or the last stats reset).
    pub total_completed: u64,
    /// Jobs permanently failed since construction (or the last stats reset).
    pub total_failed: u64,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(!JobState::Pending { retry_count: 0 }.is_terminal());
        assert!(
            !JobState::Downloading {
                progress_percent: 50.0
            }
            .is_terminal()
        );
        assert!(
            JobState::Failed {
                error: "download failed after 3 attempts".to_string(),
                attempts: 3
            }
            .is_terminal()
        );
        assert!(
            JobState::Completed {
                result: CompletedDownload {
                    file_path: "music/a.mp3".into(),
                    file_size: 10,
                    tags: TrackTags::default(),
                    album_art: None,
                }
            }
            .is_terminal()
        );
    }

    #[test]
    fn test_job_state_serializes_with_status_tag() {
        let state = JobState::Pending { retry_count: 2 };
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["status"], "pending");
        assert_eq!(json["retry_count"], 2);
    }

    #[test]
    fn test_snapshot_serializes_for_ui_consumers() {
        let snapshot = QueueSnapshot {
            pending_count: 1,
            active_job: Some(Job {
                track: TrackRequest {
                    id: "t1".to_string(),
                    title: "Theme".to_string(),
                    source_url: "https://cdn.example.com/theme.mp3".to_string(),
                },
                state: JobState::Downloading {
                    progress_percent: 42.0,
                },
            }),
            is_paused: false,
            total_completed: 3,
            total_failed: 1,
        };
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["pending_count"], 1);
        assert_eq!(json["active_job"]["state"]["status"], "downloading");
    }
}
