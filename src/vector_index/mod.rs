//! Vector index abstraction for Svar.
//!
//! The index is an external collaborator consumed through a narrow
//! interface: batched upserts and top-k similarity queries, partitioned by
//! namespace. Vector ids are chunk content hashes and the metadata carries
//! enough provenance to cite the source without a store round-trip.

mod memory;
mod sqlite;

pub use memory::MemoryVectorIndex;
pub use sqlite::SqliteVectorIndex;

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Upserts are split into batches of this size to respect backend payload
/// limits. Batches run sequentially; a batch failure propagates.
pub const UPSERT_BATCH_SIZE: usize = 100;

/// Provenance metadata stored alongside each vector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorMetadata {
    pub video_id: String,
    pub start: i64,
    pub end: i64,
}

/// A vector to upsert: `(id, embedding, metadata)`.
#[derive(Debug, Clone)]
pub struct VectorRecord {
    /// Chunk content hash.
    pub id: String,
    /// Embedding values.
    pub values: Vec<f32>,
    pub metadata: VectorMetadata,
}

/// A similarity match returned from a query.
#[derive(Debug, Clone)]
pub struct VectorMatch {
    pub id: String,
    /// Similarity score (higher is better).
    pub score: f32,
    pub metadata: VectorMetadata,
}

/// Trait for vector index handles.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Upsert vectors into a namespace. Returns the number written.
    async fn upsert(&self, namespace: &str, records: &[VectorRecord]) -> Result<usize>;

    /// Query the namespace for the `top_k` nearest vectors.
    async fn query(
        &self,
        namespace: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<VectorMatch>>;
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}
