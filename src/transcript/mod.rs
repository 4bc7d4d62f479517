//! Transcript segment model and acquisition driver.
//!
//! Transcript acquisition itself (platform APIs, subtitle extractors) lives
//! behind the [`fetch::TranscriptSource`] trait; this module owns the
//! normalized segment shape the rest of the pipeline consumes.

pub mod fetch;

pub use fetch::{SourceError, TranscriptFetcher, TranscriptSource};

use regex::Regex;
use serde::{Deserialize, Serialize};

/// A normalized transcript segment. Immutable once fetched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptSegment {
    /// Segment text.
    pub text: String,
    /// Start offset in seconds.
    pub start: f64,
    /// Duration in seconds.
    pub duration: f64,
}

impl TranscriptSegment {
    pub fn new(text: impl Into<String>, start: f64, duration: f64) -> Self {
        Self {
            text: text.into(),
            start,
            duration,
        }
    }

    /// End offset in seconds.
    pub fn end(&self) -> f64 {
        self.start + self.duration
    }
}

/// A segment as delivered by an acquisition backend.
///
/// Sources disagree on shape: some report `{text, start, duration}`, others
/// `{text, start, end}`. Both deserialize here and normalize to
/// [`TranscriptSegment`].
#[derive(Debug, Clone, Deserialize)]
pub struct RawSegment {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub start: f64,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub end: Option<f64>,
}

/// Normalize raw segments: trim text, drop empty segments, and derive
/// duration from `end` when only that is present.
pub fn normalize_segments(items: &[RawSegment]) -> Vec<TranscriptSegment> {
    items
        .iter()
        .filter_map(|it| {
            let text = it.text.trim();
            if text.is_empty() {
                return None;
            }
            let duration = match (it.duration, it.end) {
                (Some(d), _) => d,
                (None, Some(end)) => (end - it.start).max(0.0),
                (None, None) => 0.0,
            };
            Some(TranscriptSegment::new(text, it.start, duration))
        })
        .collect()
}

/// Extract an 11-character video id from a watch URL, short URL, or bare id.
pub fn extract_video_id(input: &str) -> Option<String> {
    let re = Regex::new(
        r"(?x)
        (?:
            (?:https?://)?
            (?:www\.)?
            (?:youtube\.com/watch\?v=|youtu\.be/|youtube\.com/embed/)
            ([a-zA-Z0-9_-]{11})
        )
        |
        ^([a-zA-Z0-9_-]{11})$
    ",
    )
    .expect("Invalid regex");

    let caps = re.captures(input.trim())?;
    caps.get(1)
        .or_else(|| caps.get(2))
        .map(|m| m.as_str().to_string())
}

/// Extract video ids from newline-separated input, erroring on any line
/// that does not parse.
pub fn extract_video_ids(input: &str) -> crate::error::Result<Vec<String>> {
    input
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            extract_video_id(line).ok_or_else(|| {
                crate::error::SvarError::InvalidInput(format!(
                    "Could not parse video id from: {}",
                    line
                ))
            })
        })
        .collect()
}
