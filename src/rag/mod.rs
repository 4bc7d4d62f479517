//! Retrieval orchestration and answer assembly.
//!
//! Provides the ability to ask questions and get grounded answers with
//! timestamped source citations and per-stage timings.

mod engine;

pub use engine::{AnswerEngine, EngineConfig};

use serde::{Deserialize, Serialize};

/// A cited source passage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Citation {
    /// Video id.
    pub video_id: String,
    /// Offset of the cited chunk, in seconds.
    pub start_seconds: i64,
    /// Timestamped watch URL.
    pub url: String,
}

/// Wall-clock duration of each pipeline stage, in milliseconds.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StageTimings {
    pub rewrite_ms: u128,
    pub embed_query_ms: u128,
    pub retrieve_ms: u128,
    pub db_fetch_ms: u128,
    pub rerank_ms: u128,
    pub generate_ms: u128,
    pub total_ms: u128,
}

/// Result of answering one question.
#[derive(Debug, Clone)]
pub struct AnswerOutcome {
    /// The generated answer.
    pub answer: String,
    /// The retrieval query actually used.
    pub rewritten_query: String,
    /// Whether the rewrite came from cache.
    pub rewrite_cached: bool,
    /// Source citations, in reranked order.
    pub sources: Vec<Citation>,
    /// Per-stage timings for observability and evaluation.
    pub timings: StageTimings,
}

/// Build a timestamped watch URL for a citation.
pub fn watch_url(video_id: &str, seconds: i64) -> String {
    format!(
        "https://www.youtube.com/watch?v={}&t={}s",
        video_id,
        seconds.max(0)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_watch_url() {
        assert_eq!(
            watch_url("dQw4w9WgXcQ", 125),
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=125s"
        );
    }

    #[test]
    fn test_watch_url_clamps_negative_offsets() {
        assert_eq!(
            watch_url("dQw4w9WgXcQ", -5),
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=0s"
        );
    }
}
