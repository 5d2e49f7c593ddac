//! Audio tag and album-art extraction.
//!
//! Parses container tags (ID3v2, Vorbis Comments, MP4, FLAC) from downloaded
//! bytes using the `lofty` crate. Extraction is a pure function of the bytes
//! and is always non-fatal: a file that cannot be parsed yields empty tags
//! and no artwork, never an error. A failed tag parse must not fail the
//! download that produced the file.

use std::io::Cursor;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use lofty::config::ParseOptions;
use lofty::file::{AudioFile, TaggedFileExt};
use lofty::picture::MimeType;
use lofty::probe::Probe;
use lofty::tag::Accessor;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Tags extracted from a downloaded track.
///
/// Every field is optional: files with no tags at all produce the default
/// value, with only the duration filled in when the container was readable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackTags {
    /// Track title.
    pub title: Option<String>,
    /// Primary artist.
    pub artist: Option<String>,
    /// Album name.
    pub album: Option<String>,
    /// Release year.
    pub year: Option<u32>,
    /// Genre classification.
    pub genre: Option<String>,
    /// Duration in seconds.
    pub duration_secs: Option<f64>,
}

/// Reads tags and embedded artwork out of audio file bytes.
#[derive(Debug, Clone)]
pub struct TagReader {
    parse_options: ParseOptions,
}

impl Default for TagReader {
    fn default() -> Self {
        Self::new()
    }
}

impl TagReader {
    /// Creates a tag reader with default parse options.
    #[must_use]
    pub fn new() -> Self {
        Self {
            parse_options: ParseOptions::new(),
        }
    }

    /// Extracts tags and the first embedded picture from `bytes`.
    ///
    /// The picture is returned as a `data:` URI ready for direct use in an
    /// image element. Parse failures degrade to `(TrackTags::default(), None)`
    /// and are logged; they never propagate.
    #[must_use]
    pub fn extract(&self, bytes: &[u8]) -> (TrackTags, Option<String>) {
        let probe = match Probe::new(Cursor::new(bytes))
            .options(self.parse_options)
            .guess_file_type()
        {
            Ok(probe) => probe,
            Err(e) => {
                warn!(error = %e, "could not probe audio container; returning empty tags");
                return (TrackTags::default(), None);
            }
        };

        let tagged = match probe.read() {
            Ok(tagged) => tagged,
            Err(e) => {
                warn!(error = %e, "tag parsing failed; returning empty tags");
                return (TrackTags::default(), None);
            }
        };

        let duration_secs = Some(tagged.properties().duration().as_secs_f64());
        let tag = tagged.primary_tag().or_else(|| tagged.first_tag());

        let tags = match tag {
            Some(tag) => TrackTags {
                title: tag.title().map(|s| s.to_string()),
                artist: tag.artist().map(|s| s.to_string()),
                album: tag.album().map(|s| s.to_string()),
                year: tag.year(),
                genre: tag.genre().map(|s| s.to_string()),
                duration_secs,
            },
            None => {
                debug!("no tags in container");
                TrackTags {
                    duration_secs,
                    ..TrackTags::default()
                }
            }
        };

        let album_art = tag.and_then(|tag| {
            tag.pictures().first().and_then(|picture| {
                let mime = picture.mime_type().and_then(mime_str)?;
                if picture.data().is_empty() {
                    return None;
                }
                Some(format!(
                    "data:{mime};base64,{}",
                    BASE64.encode(picture.data())
                ))
            })
        });

        (tags, album_art)
    }
}

/// Maps a lofty MIME type to its string form, `None` for unusable types.
fn mime_str(mime_type: &MimeType) -> Option<&'static str> {
    match mime_type {
        MimeType::Png => Some("image/png"),
        MimeType::Jpeg => Some("image/jpeg"),
        MimeType::Tiff => Some("image/tiff"),
        MimeType::Bmp => Some("image/bmp"),
        MimeType::Gif => Some("image/gif"),
        _ => None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_garbage_bytes_degrade_to_empty_tags() {
        let reader = TagReader::new();
        let (tags, art) = reader.extract(b"this is definitely not an audio file");
        assert_eq!(tags, TrackTags::default());
        assert!(art.is_none());
    }

    #[test]
    fn test_empty_input_degrades_to_empty_tags() {
        let reader = TagReader::new();
        let (tags, art) = reader.extract(&[]);
        assert_eq!(tags, TrackTags::default());
        assert!(art.is_none());
    }

    #[test]
    fn test_track_tags_serialize_roundtrip() {
        let tags = TrackTags {
            title: Some("Focus Beats".to_string()),
            artist: Some("Study Crew".to_string()),
            album: None,
            year: Some(2023),
            genre: Some("Lo-fi".to_string()),
            duration_secs: Some(181.5),
        };
        let json = serde_json::to_string(&tags).unwrap();
        let back: TrackTags = serde_json::from_str(&json).unwrap();
        assert_eq!(tags, back);
    }

    #[test]
    fn test_mime_str_known_and_unknown() {
        assert_eq!(mime_str(&MimeType::Png), Some("image/png"));
        assert_eq!(mime_str(&MimeType::Jpeg), Some("image/jpeg"));
        assert_eq!(mime_str(&MimeType::Unknown("image/webp".to_string())), None);
    }
}
