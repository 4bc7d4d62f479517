//! Idempotent transcript ingestion.
//!
//! Two dedup layers run on every attempt: the ingestion ledger skips whole
//! videos that previously completed, and content-addressed chunk ids skip
//! individual rows that survived a partial earlier run. Only rows that are
//! actually new get embedded and upserted, so repeated runs never duplicate
//! spend.

use crate::chunking::{chunk_transcript, Chunk};
use crate::config::ChunkingSettings;
use crate::embedding::Embedder;
use crate::error::Result;
use crate::store::{IngestStatus, Store};
use crate::transcript::TranscriptSegment;
use crate::vector_index::{VectorIndex, VectorMetadata, VectorRecord};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Stats from one ingestion attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestOutcome {
    pub video_id: String,
    /// True when a prior completed ingestion short-circuited this run.
    pub skipped: bool,
    /// Chunk rows newly inserted (and therefore embedded and upserted).
    pub new_chunks: usize,
}

/// Drives ingestion for one namespace.
pub struct Ingestor {
    store: Arc<dyn Store>,
    index: Arc<dyn VectorIndex>,
    embedder: Arc<dyn Embedder>,
    namespace: String,
    chunking: ChunkingSettings,
}

impl Ingestor {
    pub fn new(
        store: Arc<dyn Store>,
        index: Arc<dyn VectorIndex>,
        embedder: Arc<dyn Embedder>,
        namespace: impl Into<String>,
        chunking: ChunkingSettings,
    ) -> Self {
        Self {
            store,
            index,
            embedder,
            namespace: namespace.into(),
            chunking,
        }
    }

    /// Ingest one video's transcript.
    ///
    /// Unless `force` is set, a prior "done" ledger record skips everything:
    /// no chunking, no embedding, no index writes. Any failure while
    /// embedding or upserting is recorded in the ledger as "failed" and
    /// re-propagated; the caller decides whether to continue with other
    /// videos.
    #[instrument(skip(self, segments), fields(video_id = %video_id))]
    pub async fn ingest_video(
        &self,
        video_id: &str,
        title: Option<&str>,
        segments: &[TranscriptSegment],
        force: bool,
    ) -> Result<IngestOutcome> {
        let model = self.embedder.model().to_string();

        if !force
            && self
                .store
                .is_ingested(&self.namespace, &model, video_id)
                .await?
        {
            info!("Video {} already ingested, skipping", video_id);
            return Ok(IngestOutcome {
                video_id: video_id.to_string(),
                skipped: true,
                new_chunks: 0,
            });
        }

        let chunks = chunk_transcript(
            video_id,
            segments,
            self.chunking.chunk_chars,
            self.chunking.overlap_chars,
        );

        self.store.upsert_video(video_id, title).await?;

        let mut new_rows: Vec<Chunk> = Vec::new();
        for chunk in chunks {
            if self.store.insert_chunk_if_absent(&chunk).await? {
                new_rows.push(chunk);
            }
        }

        if new_rows.is_empty() {
            // Everything was already present from an earlier (possibly
            // partial) run; completing the ledger is all that is left.
            self.store
                .mark_ingested(&self.namespace, &model, video_id, IngestStatus::Done, None)
                .await?;
            return Ok(IngestOutcome {
                video_id: video_id.to_string(),
                skipped: false,
                new_chunks: 0,
            });
        }

        match self.embed_and_upsert(&new_rows).await {
            Ok(()) => {
                self.store
                    .mark_ingested(&self.namespace, &model, video_id, IngestStatus::Done, None)
                    .await?;
                info!("Ingested {} new chunks for {}", new_rows.len(), video_id);
                Ok(IngestOutcome {
                    video_id: video_id.to_string(),
                    skipped: false,
                    new_chunks: new_rows.len(),
                })
            }
            Err(e) => {
                if let Err(mark_err) = self
                    .store
                    .mark_ingested(
                        &self.namespace,
                        &model,
                        video_id,
                        IngestStatus::Failed,
                        Some(&e.to_string()),
                    )
                    .await
                {
                    warn!("Failed to record ingestion failure: {}", mark_err);
                }
                Err(e)
            }
        }
    }

    async fn embed_and_upsert(&self, new_rows: &[Chunk]) -> Result<()> {
        let texts: Vec<String> = new_rows.iter().map(|c| c.text.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;

        let records: Vec<VectorRecord> = new_rows
            .iter()
            .zip(embeddings)
            .map(|(chunk, values)| VectorRecord {
                id: chunk.id.clone(),
                values,
                metadata: VectorMetadata {
                    video_id: chunk.video_id.clone(),
                    start: chunk.start,
                    end: chunk.end,
                },
            })
            .collect();

        self.index.upsert(&self.namespace, &records).await?;
        Ok(())
    }
}
