//! SQLite-backed relational store.

use super::{IngestStatus, IngestionRecord, Store, Video};
use crate::chunking::Chunk;
use crate::error::{Result, SvarError};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS videos (
        id TEXT PRIMARY KEY,
        title TEXT
    );

    CREATE TABLE IF NOT EXISTS chunks (
        id TEXT PRIMARY KEY,
        video_id TEXT NOT NULL REFERENCES videos(id),
        start_seconds INTEGER NOT NULL,
        end_seconds INTEGER NOT NULL,
        content TEXT NOT NULL,
        UNIQUE(video_id, start_seconds, end_seconds)
    );

    CREATE INDEX IF NOT EXISTS idx_chunks_video_id ON chunks(video_id);
    CREATE INDEX IF NOT EXISTS idx_chunks_video_time ON chunks(video_id, start_seconds);

    CREATE TABLE IF NOT EXISTS ingestion_log (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        namespace TEXT NOT NULL,
        embed_model TEXT NOT NULL,
        video_id TEXT NOT NULL,
        status TEXT NOT NULL DEFAULT 'done',
        error TEXT,
        UNIQUE(namespace, embed_model, video_id)
    );

    CREATE INDEX IF NOT EXISTS idx_ingestion_namespace ON ingestion_log(namespace);
"#;

/// SQLite-backed store.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a store at the given path.
    pub fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        info!("Initialized store at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| SvarError::Store(format!("Failed to acquire lock: {}", e)))
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn upsert_video(&self, id: &str, title: Option<&str>) -> Result<()> {
        let conn = self.lock()?;

        // Title is fill-once: first writer wins, later titles never clobber.
        conn.execute(
            r#"
            INSERT INTO videos (id, title) VALUES (?1, ?2)
            ON CONFLICT(id) DO UPDATE SET title = excluded.title
            WHERE videos.title IS NULL AND excluded.title IS NOT NULL
            "#,
            params![id, title],
        )?;

        Ok(())
    }

    async fn get_video(&self, id: &str) -> Result<Option<Video>> {
        let conn = self.lock()?;

        let video = conn
            .query_row(
                "SELECT id, title FROM videos WHERE id = ?1",
                params![id],
                |row| {
                    Ok(Video {
                        id: row.get(0)?,
                        title: row.get(1)?,
                    })
                },
            )
            .optional()?;

        Ok(video)
    }

    async fn insert_chunk_if_absent(&self, chunk: &Chunk) -> Result<bool> {
        let conn = self.lock()?;

        let inserted = conn.execute(
            r#"
            INSERT OR IGNORE INTO chunks (id, video_id, start_seconds, end_seconds, content)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![chunk.id, chunk.video_id, chunk.start, chunk.end, chunk.text],
        )?;

        Ok(inserted > 0)
    }

    async fn get_chunks(&self, ids: &[String]) -> Result<Vec<Chunk>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            "SELECT id, video_id, start_seconds, end_seconds, content FROM chunks WHERE id = ?1",
        )?;

        let mut chunks = Vec::with_capacity(ids.len());
        for id in ids {
            let chunk = stmt
                .query_row(params![id], |row| {
                    Ok(Chunk {
                        id: row.get(0)?,
                        video_id: row.get(1)?,
                        start: row.get(2)?,
                        end: row.get(3)?,
                        text: row.get(4)?,
                    })
                })
                .optional()?;

            match chunk {
                Some(c) => chunks.push(c),
                None => debug!("Chunk {} not found in store, skipping", id),
            }
        }

        Ok(chunks)
    }

    async fn chunk_count(&self, video_id: &str) -> Result<usize> {
        let conn = self.lock()?;

        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM chunks WHERE video_id = ?1",
            params![video_id],
            |row| row.get(0),
        )?;

        Ok(count as usize)
    }

    async fn is_ingested(
        &self,
        namespace: &str,
        embed_model: &str,
        video_id: &str,
    ) -> Result<bool> {
        let conn = self.lock()?;

        let found: Option<i64> = conn
            .query_row(
                r#"
                SELECT 1 FROM ingestion_log
                WHERE namespace = ?1 AND embed_model = ?2 AND video_id = ?3
                  AND status = 'done'
                "#,
                params![namespace, embed_model, video_id],
                |row| row.get(0),
            )
            .optional()?;

        Ok(found.is_some())
    }

    async fn mark_ingested(
        &self,
        namespace: &str,
        embed_model: &str,
        video_id: &str,
        status: IngestStatus,
        error: Option<&str>,
    ) -> Result<()> {
        let conn = self.lock()?;

        conn.execute(
            r#"
            INSERT INTO ingestion_log (namespace, embed_model, video_id, status, error)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(namespace, embed_model, video_id)
            DO UPDATE SET status = excluded.status, error = excluded.error
            "#,
            params![namespace, embed_model, video_id, status.as_str(), error],
        )?;

        Ok(())
    }

    async fn get_ingestion(
        &self,
        namespace: &str,
        embed_model: &str,
        video_id: &str,
    ) -> Result<Option<IngestionRecord>> {
        let conn = self.lock()?;

        let record = conn
            .query_row(
                r#"
                SELECT namespace, embed_model, video_id, status, error FROM ingestion_log
                WHERE namespace = ?1 AND embed_model = ?2 AND video_id = ?3
                "#,
                params![namespace, embed_model, video_id],
                |row| {
                    let status_str: String = row.get(3)?;
                    let status = status_str.parse().map_err(|e: String| {
                        rusqlite::Error::FromSqlConversionFailure(
                            3,
                            rusqlite::types::Type::Text,
                            e.into(),
                        )
                    })?;
                    Ok(IngestionRecord {
                        namespace: row.get(0)?,
                        embed_model: row.get(1)?,
                        video_id: row.get(2)?,
                        status,
                        error: row.get(4)?,
                    })
                },
            )
            .optional()?;

        Ok(record)
    }
}
