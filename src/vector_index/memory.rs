//! In-memory vector index implementation.
//!
//! Useful for testing and small datasets.

use super::{cosine_similarity, VectorIndex, VectorMatch, VectorRecord};
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

/// In-memory vector index.
pub struct MemoryVectorIndex {
    // Keyed by (namespace, id).
    vectors: RwLock<HashMap<(String, String), VectorRecord>>,
}

impl MemoryVectorIndex {
    /// Create a new in-memory index.
    pub fn new() -> Self {
        Self {
            vectors: RwLock::new(HashMap::new()),
        }
    }

    /// Number of vectors stored in a namespace.
    pub fn count(&self, namespace: &str) -> usize {
        let vectors = self.vectors.read().unwrap();
        vectors.keys().filter(|(ns, _)| ns == namespace).count()
    }
}

impl Default for MemoryVectorIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorIndex for MemoryVectorIndex {
    async fn upsert(&self, namespace: &str, records: &[VectorRecord]) -> Result<usize> {
        let mut vectors = self.vectors.write().unwrap();
        for record in records {
            vectors.insert((namespace.to_string(), record.id.clone()), record.clone());
        }
        Ok(records.len())
    }

    async fn query(
        &self,
        namespace: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<VectorMatch>> {
        let vectors = self.vectors.read().unwrap();

        let mut matches: Vec<VectorMatch> = vectors
            .iter()
            .filter(|((ns, _), _)| ns == namespace)
            .map(|((_, id), record)| VectorMatch {
                id: id.clone(),
                score: cosine_similarity(embedding, &record.values),
                metadata: record.metadata.clone(),
            })
            .collect();

        matches.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        matches.truncate(top_k);

        Ok(matches)
    }
}
