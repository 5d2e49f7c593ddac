//! Constants for the download module (retry policy, pacing, timeouts).

use std::time::Duration;

/// Maximum transfer attempts per job, including the first one.
pub const MAX_RETRIES: u32 = 3;

/// Fixed wait before a failed job is requeued for another attempt.
pub const RETRY_DELAY: Duration = Duration::from_millis(1000);

/// Pause between jobs so sequential writes do not saturate the storage subsystem.
pub const INTER_JOB_DELAY: Duration = Duration::from_millis(500);

/// Default HTTP connect timeout (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default HTTP read timeout (5 minutes for large audio files).
pub const READ_TIMEOUT_SECS: u64 = 300;
