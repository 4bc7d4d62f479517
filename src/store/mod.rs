//! Relational store for Svar.
//!
//! Holds source videos, content-addressed chunks, and the ingestion ledger
//! that makes repeated ingestion runs idempotent.

mod sqlite;

pub use sqlite::SqliteStore;

use crate::chunking::Chunk;
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A source video row. Title is fill-once: set if absent, never overwritten.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Video {
    pub id: String,
    pub title: Option<String>,
}

/// Outcome of an ingestion attempt for one `(namespace, model, video)` identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IngestStatus {
    Done,
    Failed,
}

impl IngestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IngestStatus::Done => "done",
            IngestStatus::Failed => "failed",
        }
    }
}

impl std::str::FromStr for IngestStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "done" => Ok(IngestStatus::Done),
            "failed" => Ok(IngestStatus::Failed),
            _ => Err(format!("Unknown ingest status: {}", s)),
        }
    }
}

/// One row of the ingestion ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionRecord {
    pub namespace: String,
    pub embed_model: String,
    pub video_id: String,
    pub status: IngestStatus,
    pub error: Option<String>,
}

/// Trait for the relational store.
#[async_trait]
pub trait Store: Send + Sync {
    /// Insert a video row, setting the title only if it is currently absent.
    async fn upsert_video(&self, id: &str, title: Option<&str>) -> Result<()>;

    /// Fetch a video row.
    async fn get_video(&self, id: &str) -> Result<Option<Video>>;

    /// Insert a chunk unless its content id already exists.
    /// Returns true when the row is new.
    async fn insert_chunk_if_absent(&self, chunk: &Chunk) -> Result<bool>;

    /// Fetch chunks by id, preserving input order and skipping missing ids.
    async fn get_chunks(&self, ids: &[String]) -> Result<Vec<Chunk>>;

    /// Number of chunk rows stored for a video.
    async fn chunk_count(&self, video_id: &str) -> Result<usize>;

    /// True only when the ledger records status "done" for the identity triple.
    async fn is_ingested(&self, namespace: &str, embed_model: &str, video_id: &str)
        -> Result<bool>;

    /// Upsert the ledger row for the identity triple.
    async fn mark_ingested(
        &self,
        namespace: &str,
        embed_model: &str,
        video_id: &str,
        status: IngestStatus,
        error: Option<&str>,
    ) -> Result<()>;

    /// Fetch the ledger row for the identity triple.
    async fn get_ingestion(
        &self,
        namespace: &str,
        embed_model: &str,
        video_id: &str,
    ) -> Result<Option<IngestionRecord>>;
}
