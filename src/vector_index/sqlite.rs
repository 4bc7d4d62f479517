//! SQLite-backed vector index.
//!
//! Similarity is computed in Rust over the candidate namespace. Fine for
//! local deployments and tests; swap the trait implementation for a hosted
//! index when the corpus outgrows a single file.

use super::{cosine_similarity, VectorIndex, VectorMatch, VectorMetadata, VectorRecord};
use super::UPSERT_BATCH_SIZE;
use crate::error::{Result, SvarError};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS indexes (
        name TEXT PRIMARY KEY,
        dimension INTEGER NOT NULL,
        metric TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS vectors (
        index_name TEXT NOT NULL REFERENCES indexes(name),
        namespace TEXT NOT NULL,
        id TEXT NOT NULL,
        embedding BLOB NOT NULL,
        video_id TEXT NOT NULL,
        start_seconds INTEGER NOT NULL,
        end_seconds INTEGER NOT NULL,
        PRIMARY KEY (index_name, namespace, id)
    );

    CREATE INDEX IF NOT EXISTS idx_vectors_namespace ON vectors(index_name, namespace);
"#;

/// Handle to one named index inside a SQLite-backed catalog.
pub struct SqliteVectorIndex {
    conn: Mutex<Connection>,
    name: String,
    dimension: usize,
}

impl std::fmt::Debug for SqliteVectorIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteVectorIndex")
            .field("name", &self.name)
            .field("dimension", &self.dimension)
            .finish()
    }
}

impl SqliteVectorIndex {
    /// Open the backend at `path` and ensure the named index exists.
    ///
    /// The create is idempotent: an existing index with the same dimension
    /// is reused; a dimension mismatch is an error.
    pub fn ensure(path: &Path, name: &str, dimension: usize, metric: &str) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Self::ensure_on(conn, name, dimension, metric)
    }

    /// In-memory variant (useful for testing).
    pub fn ensure_in_memory(name: &str, dimension: usize, metric: &str) -> Result<Self> {
        Self::ensure_on(Connection::open_in_memory()?, name, dimension, metric)
    }

    fn ensure_on(conn: Connection, name: &str, dimension: usize, metric: &str) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;

        let existing: Option<(i64, String)> = conn
            .query_row(
                "SELECT dimension, metric FROM indexes WHERE name = ?1",
                params![name],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        match existing {
            Some((existing_dim, _)) if existing_dim as usize != dimension => {
                return Err(SvarError::VectorIndex(format!(
                    "Index '{}' exists with dimension {}, requested {}",
                    name, existing_dim, dimension
                )));
            }
            Some(_) => {
                debug!("Reusing existing index '{}'", name);
            }
            None => {
                conn.execute(
                    "INSERT INTO indexes (name, dimension, metric) VALUES (?1, ?2, ?3)",
                    params![name, dimension as i64, metric],
                )?;
                info!("Created index '{}' (dimension {}, {})", name, dimension, metric);
            }
        }

        Ok(Self {
            conn: Mutex::new(conn),
            name: name.to_string(),
            dimension,
        })
    }

    /// The embedding dimension this index was created with.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| SvarError::VectorIndex(format!("Failed to acquire lock: {}", e)))
    }

    fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| {
                let arr: [u8; 4] = chunk.try_into().unwrap_or_default();
                f32::from_le_bytes(arr)
            })
            .collect()
    }
}

#[async_trait]
impl VectorIndex for SqliteVectorIndex {
    async fn upsert(&self, namespace: &str, records: &[VectorRecord]) -> Result<usize> {
        for record in records {
            if record.values.len() != self.dimension {
                return Err(SvarError::VectorIndex(format!(
                    "Vector {} has dimension {}, index '{}' expects {}",
                    record.id,
                    record.values.len(),
                    self.name,
                    self.dimension
                )));
            }
        }

        let conn = self.lock()?;

        // Sequential batches; a failed batch propagates without retry.
        for batch in records.chunks(UPSERT_BATCH_SIZE) {
            let tx = conn.unchecked_transaction()?;
            for record in batch {
                tx.execute(
                    r#"
                    INSERT OR REPLACE INTO vectors
                    (index_name, namespace, id, embedding, video_id, start_seconds, end_seconds)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                    "#,
                    params![
                        self.name,
                        namespace,
                        record.id,
                        Self::embedding_to_bytes(&record.values),
                        record.metadata.video_id,
                        record.metadata.start,
                        record.metadata.end,
                    ],
                )?;
            }
            tx.commit()?;
        }

        debug!(
            "Upserted {} vectors into '{}'/{}",
            records.len(),
            self.name,
            namespace
        );
        Ok(records.len())
    }

    async fn query(
        &self,
        namespace: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<VectorMatch>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT id, embedding, video_id, start_seconds, end_seconds
            FROM vectors
            WHERE index_name = ?1 AND namespace = ?2
            "#,
        )?;

        let rows = stmt.query_map(params![self.name, namespace], |row| {
            let embedding_bytes: Vec<u8> = row.get(1)?;
            Ok((
                row.get::<_, String>(0)?,
                Self::bytes_to_embedding(&embedding_bytes),
                VectorMetadata {
                    video_id: row.get(2)?,
                    start: row.get(3)?,
                    end: row.get(4)?,
                },
            ))
        })?;

        let mut matches: Vec<VectorMatch> = Vec::new();
        for row in rows {
            let (id, values, metadata) = row?;
            matches.push(VectorMatch {
                id,
                score: cosine_similarity(embedding, &values),
                metadata,
            });
        }

        matches.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        matches.truncate(top_k);

        Ok(matches)
    }
}
