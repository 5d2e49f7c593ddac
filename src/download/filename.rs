//! Destination filename resolution for downloaded tracks.
//!
//! Filenames are derived from the last path segment of the source URL,
//! percent-decoded and sanitized. When the URL carries no usable segment
//! the job id is used with an `.mp3` extension.

use url::Url;

/// Characters never allowed in a destination filename.
const FORBIDDEN: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|', '\0'];

/// Resolves the destination filename for a track.
///
/// Falls back to `<job_id>.mp3` when the URL has no usable final segment
/// (trailing slash, bare host, query-only endpoints).
#[must_use]
pub fn resolve_filename(source_url: &str, job_id: &str) -> String {
    filename_from_url(source_url).unwrap_or_else(|| format!("{job_id}.mp3"))
}

/// Extracts a sanitized filename from the URL's last path segment, if any.
#[must_use]
pub fn filename_from_url(source_url: &str) -> Option<String> {
    let parsed = Url::parse(source_url).ok()?;
    let segment = parsed.path_segments()?.next_back()?;
    if segment.is_empty() {
        return None;
    }
    let decoded = urlencoding::decode(segment)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| segment.to_string());
    let sanitized = sanitize(&decoded);
    (!sanitized.is_empty()).then_some(sanitized)
}

fn sanitize(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| !FORBIDDEN.contains(c) && !c.is_control())
        .collect();
    // Reject names that are only dots or whitespace
    let trimmed = cleaned.trim().trim_matches('.');
    trimmed.to_string()
}
