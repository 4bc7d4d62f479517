//! Transcript acquisition driver.
//!
//! Wraps a primary [`TranscriptSource`] (typically a platform transcript
//! API) and an optional fallback (typically a subtitle extractor). Transient
//! primary failures are retried with linear backoff; permanent failures go
//! straight to the fallback. When both are exhausted the combined error
//! names the video and both underlying causes, so failures can be diagnosed
//! without log access.

use super::{normalize_segments, RawSegment, TranscriptSegment};
use crate::error::{Result, SvarError};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors an acquisition backend can report.
#[derive(Error, Debug)]
pub enum SourceError {
    /// Transcripts are disabled for this video. Permanent, never retried.
    #[error("transcripts are disabled for this video")]
    Disabled,

    /// No transcript exists in any acceptable language. Permanent.
    #[error("no transcript found")]
    NotFound,

    /// Anything transient: network flakiness, rate limits, 5xx responses.
    #[error("{0}")]
    Unavailable(String),
}

impl SourceError {
    /// Permanent errors skip remaining retries and fall back immediately.
    pub fn is_permanent(&self) -> bool {
        matches!(self, SourceError::Disabled | SourceError::NotFound)
    }
}

/// Trait for transcript acquisition backends.
#[async_trait]
pub trait TranscriptSource: Send + Sync {
    /// Short name used in diagnostics (e.g. "transcript-api", "subtitles").
    fn name(&self) -> &str;

    /// Fetch raw segments for a video.
    async fn fetch(&self, video_id: &str) -> std::result::Result<Vec<RawSegment>, SourceError>;
}

/// Default number of primary attempts.
const DEFAULT_RETRIES: u32 = 3;

/// Default base backoff between primary attempts.
const DEFAULT_BACKOFF: Duration = Duration::from_millis(1500);

/// Drives transcript acquisition across a primary and a fallback source.
pub struct TranscriptFetcher {
    primary: Arc<dyn TranscriptSource>,
    fallback: Option<Arc<dyn TranscriptSource>>,
    retries: u32,
    backoff: Duration,
}

impl TranscriptFetcher {
    /// Create a fetcher with default retry policy.
    pub fn new(primary: Arc<dyn TranscriptSource>) -> Self {
        Self {
            primary,
            fallback: None,
            retries: DEFAULT_RETRIES,
            backoff: DEFAULT_BACKOFF,
        }
    }

    /// Add a fallback source tried after the primary is exhausted.
    pub fn with_fallback(mut self, fallback: Arc<dyn TranscriptSource>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// Override the retry policy.
    pub fn with_retry_policy(mut self, retries: u32, backoff: Duration) -> Self {
        self.retries = retries.max(1);
        self.backoff = backoff;
        self
    }

    /// Fetch and normalize a transcript.
    ///
    /// Nothing is persisted on failure; the error carries the causes from
    /// both acquisition paths.
    pub async fn fetch(&self, video_id: &str) -> Result<Vec<TranscriptSegment>> {
        let primary_err = match self.try_primary(video_id).await {
            Ok(segments) => return Ok(segments),
            Err(e) => e,
        };

        let fallback_err = match &self.fallback {
            Some(fallback) => match Self::try_source(fallback.as_ref(), video_id).await {
                Ok(segments) => return Ok(segments),
                Err(e) => e.message,
            },
            None => "no fallback source configured".to_string(),
        };

        Err(SvarError::TranscriptUnavailable {
            video_id: video_id.to_string(),
            primary: primary_err.message,
            fallback: fallback_err,
        })
    }

    /// Try the primary source up to `retries` times with linear backoff.
    async fn try_primary(
        &self,
        video_id: &str,
    ) -> std::result::Result<Vec<TranscriptSegment>, AttemptError> {
        let mut last_err = AttemptError {
            permanent: false,
            message: String::new(),
        };

        for attempt in 1..=self.retries {
            match Self::try_source(self.primary.as_ref(), video_id).await {
                Ok(segments) => return Ok(segments),
                Err(e) => {
                    last_err = e;
                    if last_err.permanent {
                        debug!(
                            video_id,
                            source = self.primary.name(),
                            "permanent source error, skipping retries"
                        );
                        break;
                    }
                    if attempt < self.retries {
                        warn!(
                            video_id,
                            attempt,
                            source = self.primary.name(),
                            "transient transcript error, retrying: {}",
                            last_err.message
                        );
                        tokio::time::sleep(self.backoff * attempt).await;
                    }
                }
            }
        }

        Err(last_err)
    }

    /// One attempt against one source, including normalization.
    async fn try_source(
        source: &dyn TranscriptSource,
        video_id: &str,
    ) -> std::result::Result<Vec<TranscriptSegment>, AttemptError> {
        match source.fetch(video_id).await {
            Ok(raw) => {
                let segments = normalize_segments(&raw);
                if segments.is_empty() {
                    Err(AttemptError {
                        permanent: false,
                        message: format!(
                            "{}: transcript fetched but empty after normalization",
                            source.name()
                        ),
                    })
                } else {
                    Ok(segments)
                }
            }
            Err(e) => Err(AttemptError {
                permanent: e.is_permanent(),
                message: format!("{}: {}", source.name(), e),
            }),
        }
    }
}

/// One failed acquisition attempt.
struct AttemptError {
    permanent: bool,
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FlakySource {
        failures_before_success: u32,
        calls: AtomicU32,
    }

    #[async_trait]
    impl TranscriptSource for FlakySource {
        fn name(&self) -> &str {
            "flaky"
        }

        async fn fetch(&self, _video_id: &str) -> std::result::Result<Vec<RawSegment>, SourceError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures_before_success {
                Err(SourceError::Unavailable("connection reset".to_string()))
            } else {
                Ok(vec![RawSegment {
                    text: "recovered".to_string(),
                    start: 0.0,
                    duration: Some(2.0),
                    end: None,
                }])
            }
        }
    }

    struct DisabledSource {
        calls: AtomicU32,
    }

    #[async_trait]
    impl TranscriptSource for DisabledSource {
        fn name(&self) -> &str {
            "api"
        }

        async fn fetch(&self, _video_id: &str) -> std::result::Result<Vec<RawSegment>, SourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(SourceError::Disabled)
        }
    }

    struct FixedSource(&'static str);

    #[async_trait]
    impl TranscriptSource for FixedSource {
        fn name(&self) -> &str {
            "subtitles"
        }

        async fn fetch(&self, _video_id: &str) -> std::result::Result<Vec<RawSegment>, SourceError> {
            Ok(vec![RawSegment {
                text: self.0.to_string(),
                start: 0.0,
                duration: None,
                end: Some(1.0),
            }])
        }
    }

    struct BrokenSource;

    #[async_trait]
    impl TranscriptSource for BrokenSource {
        fn name(&self) -> &str {
            "subtitles"
        }

        async fn fetch(&self, _video_id: &str) -> std::result::Result<Vec<RawSegment>, SourceError> {
            Err(SourceError::Unavailable("no captions track".to_string()))
        }
    }

    #[tokio::test]
    async fn test_retries_transient_then_succeeds() {
        let primary = Arc::new(FlakySource {
            failures_before_success: 2,
            calls: AtomicU32::new(0),
        });
        let fetcher = TranscriptFetcher::new(primary.clone())
            .with_retry_policy(3, Duration::from_millis(1));

        let segments = fetcher.fetch("abc123def45").await.unwrap();
        assert_eq!(segments[0].text, "recovered");
        assert_eq!(primary.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_error_skips_retries_and_falls_back() {
        let primary = Arc::new(DisabledSource {
            calls: AtomicU32::new(0),
        });
        let fetcher = TranscriptFetcher::new(primary.clone())
            .with_retry_policy(3, Duration::from_millis(1))
            .with_fallback(Arc::new(FixedSource("from subtitles")));

        let segments = fetcher.fetch("abc123def45").await.unwrap();
        assert_eq!(segments[0].text, "from subtitles");
        // No retries for a permanent error.
        assert_eq!(primary.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_both_paths_exhausted_reports_both_causes() {
        let fetcher = TranscriptFetcher::new(Arc::new(DisabledSource {
            calls: AtomicU32::new(0),
        }))
        .with_retry_policy(2, Duration::from_millis(1))
        .with_fallback(Arc::new(BrokenSource));

        let err = fetcher.fetch("abc123def45").await.unwrap_err();
        let message = err.to_string();
        assert!(message.contains("abc123def45"));
        assert!(message.contains("disabled"));
        assert!(message.contains("no captions track"));
    }

    #[tokio::test]
    async fn test_no_fallback_configured() {
        let fetcher = TranscriptFetcher::new(Arc::new(BrokenSource))
            .with_retry_policy(1, Duration::from_millis(1));

        let err = fetcher.fetch("abc123def45").await.unwrap_err();
        assert!(err.to_string().contains("no fallback source configured"));
    }
}
