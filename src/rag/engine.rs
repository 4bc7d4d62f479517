//! The answer engine: rewrite, retrieve, rerank, generate.

use super::{watch_url, AnswerOutcome, Citation, StageTimings};
use crate::cache::Cache;
use crate::chunking::Chunk;
use crate::config::{Prompts, Settings};
use crate::embedding::Embedder;
use crate::error::Result;
use crate::llm::{ChatMessage, ChatModel};
use crate::rerank::Reranker;
use crate::rewrite::QueryRewriter;
use crate::store::Store;
use crate::vector_index::VectorIndex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument};

/// Answer returned when retrieval comes back empty. No generation call is
/// made in that case.
const NO_CONTEXT_ANSWER: &str =
    "I couldn't find any relevant transcript passages for this question.";

/// Engine parameters.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Namespace queried in the vector index.
    pub namespace: String,
    /// Candidate count retrieved from the vector index.
    pub fetch_k: usize,
    /// Final count retained after reranking.
    pub top_k: usize,
    /// Time-to-live for cached query rewrites.
    pub rewrite_ttl: std::time::Duration,
}

impl EngineConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            namespace: settings.general.namespace.clone(),
            fetch_k: settings.retrieval.fetch_k,
            top_k: settings.retrieval.top_k,
            rewrite_ttl: settings.cache.rewrite_ttl(),
        }
    }
}

/// Answers questions against the ingested corpus.
///
/// One invocation is sequential: each stage blocks on the previous one.
/// Concurrency happens across independent invocations; all shared
/// collaborators are safe for that by contract.
pub struct AnswerEngine {
    store: Arc<dyn Store>,
    index: Arc<dyn VectorIndex>,
    embedder: Arc<dyn Embedder>,
    chat: Arc<dyn ChatModel>,
    rewriter: QueryRewriter,
    reranker: Reranker,
    prompts: Prompts,
    config: EngineConfig,
}

impl AnswerEngine {
    pub fn new(
        store: Arc<dyn Store>,
        index: Arc<dyn VectorIndex>,
        embedder: Arc<dyn Embedder>,
        chat: Arc<dyn ChatModel>,
        cache: Arc<dyn Cache>,
        prompts: Prompts,
        config: EngineConfig,
    ) -> Self {
        let rewriter = QueryRewriter::new(chat.clone(), cache, prompts.clone(), config.rewrite_ttl);
        let reranker = Reranker::new(chat.clone(), prompts.clone());

        Self {
            store,
            index,
            embedder,
            chat,
            rewriter,
            reranker,
            prompts,
            config,
        }
    }

    /// Answer a question using conversation context.
    ///
    /// `summary` and `recent_turns` are the caller-held session state; they
    /// feed the rewrite stage so follow-ups resolve correctly.
    #[instrument(skip(self, summary, recent_turns), fields(question = %question))]
    pub async fn answer_question(
        &self,
        question: &str,
        summary: &str,
        recent_turns: &[ChatMessage],
    ) -> Result<AnswerOutcome> {
        let total = Instant::now();
        let mut timings = StageTimings::default();

        // 1. Rewrite (cache-checked).
        let stage = Instant::now();
        let (query, rewrite_cached) = self
            .rewriter
            .rewrite(question, &self.config.namespace, summary, recent_turns)
            .await?;
        timings.rewrite_ms = stage.elapsed().as_millis();
        debug!("Retrieval query: {}", query);

        // 2. Embed the rewritten query.
        let stage = Instant::now();
        let query_embedding = self.embedder.embed(&query).await?;
        timings.embed_query_ms = stage.elapsed().as_millis();

        // 3. Vector search for fetch_k candidates.
        let stage = Instant::now();
        let matches = self
            .index
            .query(&self.config.namespace, &query_embedding, self.config.fetch_k)
            .await?;
        timings.retrieve_ms = stage.elapsed().as_millis();

        // 4. Fetch full chunk rows, preserving score order.
        let stage = Instant::now();
        let ids: Vec<String> = matches.iter().map(|m| m.id.clone()).collect();
        let chunks = self.store.get_chunks(&ids).await?;
        timings.db_fetch_ms = stage.elapsed().as_millis();

        if chunks.is_empty() {
            timings.total_ms = total.elapsed().as_millis();
            info!("No candidates retrieved, returning canned answer");
            return Ok(AnswerOutcome {
                answer: NO_CONTEXT_ANSWER.to_string(),
                rewritten_query: query,
                rewrite_cached,
                sources: Vec::new(),
                timings,
            });
        }

        // 5. Rerank down to top_k.
        let stage = Instant::now();
        let candidates: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let kept = self
            .reranker
            .rerank(question, &candidates, self.config.top_k)
            .await;
        timings.rerank_ms = stage.elapsed().as_millis();

        let selected: Vec<&Chunk> = kept.iter().map(|&i| &chunks[i]).collect();

        // 6. Generate the grounded answer.
        let stage = Instant::now();
        let answer = self.generate_answer(question, &selected).await?;
        timings.generate_ms = stage.elapsed().as_millis();

        let sources = selected
            .iter()
            .map(|chunk| Citation {
                video_id: chunk.video_id.clone(),
                start_seconds: chunk.start,
                url: watch_url(&chunk.video_id, chunk.start),
            })
            .collect();

        timings.total_ms = total.elapsed().as_millis();
        info!(
            "Answered with {} sources in {}ms",
            kept.len(),
            timings.total_ms
        );

        Ok(AnswerOutcome {
            answer,
            rewritten_query: query,
            rewrite_cached,
            sources,
            timings,
        })
    }

    async fn generate_answer(&self, question: &str, selected: &[&Chunk]) -> Result<String> {
        let context = selected
            .iter()
            .enumerate()
            .map(|(i, chunk)| {
                format!(
                    "---\n[{}] {} @ {}s\n{}\n---",
                    i + 1,
                    chunk.video_id,
                    chunk.start,
                    chunk.text
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n");

        let mut vars = HashMap::new();
        vars.insert("question".to_string(), question.to_string());
        vars.insert("context".to_string(), context);

        let system = self
            .prompts
            .render_with_custom(&self.prompts.answer.system, &vars);
        let user = self
            .prompts
            .render_with_custom(&self.prompts.answer.user, &vars);

        self.chat.complete(&system, &user).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::SqliteCache;
    use crate::config::ChunkingSettings;
    use crate::embedding::testing::HashEmbedder;
    use crate::ingest::Ingestor;
    use crate::llm::testing::ScriptedChatModel;
    use crate::store::SqliteStore;
    use crate::transcript::TranscriptSegment;
    use crate::vector_index::MemoryVectorIndex;

    const NS: &str = "testns";

    fn config() -> EngineConfig {
        EngineConfig {
            namespace: NS.to_string(),
            fetch_k: 10,
            top_k: 3,
            rewrite_ttl: std::time::Duration::from_secs(60),
        }
    }

    async fn seeded_corpus(
        store: &Arc<SqliteStore>,
        index: &Arc<MemoryVectorIndex>,
        embedder: &Arc<HashEmbedder>,
    ) {
        let ingestor = Ingestor::new(
            store.clone(),
            index.clone(),
            embedder.clone(),
            NS,
            ChunkingSettings {
                chunk_chars: 30,
                overlap_chars: 0,
            },
        );

        let segments = vec![
            TranscriptSegment::new("rust ownership explained in depth", 0.0, 30.0),
            TranscriptSegment::new("borrowing rules and lifetimes", 30.0, 30.0),
            TranscriptSegment::new("async runtimes and tasks", 60.0, 30.0),
        ];
        ingestor
            .ingest_video("dQw4w9WgXcQ", Some("Rust Talk"), &segments, false)
            .await
            .unwrap();
    }

    fn engine(
        store: Arc<SqliteStore>,
        index: Arc<MemoryVectorIndex>,
        embedder: Arc<HashEmbedder>,
        chat: Arc<ScriptedChatModel>,
    ) -> AnswerEngine {
        AnswerEngine::new(
            store,
            index,
            embedder,
            chat,
            Arc::new(SqliteCache::in_memory().unwrap()),
            Prompts::default(),
            config(),
        )
    }

    #[tokio::test]
    async fn test_answer_question_end_to_end() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let index = Arc::new(MemoryVectorIndex::new());
        let embedder = Arc::new(HashEmbedder::new(8));
        seeded_corpus(&store, &index, &embedder).await;

        // Candidates fit within top_k, so the rerank identity path applies:
        // the scripted calls are rewrite then answer.
        let chat = Arc::new(ScriptedChatModel::new(vec![
            "rust ownership",
            "Ownership moves values; borrowing lends them.",
        ]));
        let engine = engine(store, index, embedder, chat.clone());

        let outcome = engine
            .answer_question("what is ownership?", "", &[])
            .await
            .unwrap();

        assert_eq!(outcome.answer, "Ownership moves values; borrowing lends them.");
        assert_eq!(outcome.rewritten_query, "rust ownership");
        assert!(!outcome.rewrite_cached);
        assert!(!outcome.sources.is_empty());
        assert!(outcome.sources[0]
            .url
            .starts_with("https://www.youtube.com/watch?v=dQw4w9WgXcQ&t="));
        assert_eq!(chat.call_count(), 2);
    }

    #[tokio::test]
    async fn test_empty_index_returns_canned_answer_without_generation() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let index = Arc::new(MemoryVectorIndex::new());
        let embedder = Arc::new(HashEmbedder::new(8));

        // Only the rewrite call should happen.
        let chat = Arc::new(ScriptedChatModel::new(vec!["rewritten"]));
        let engine = engine(store, index, embedder, chat.clone());

        let outcome = engine.answer_question("anything?", "", &[]).await.unwrap();

        assert_eq!(outcome.answer, NO_CONTEXT_ANSWER);
        assert!(outcome.sources.is_empty());
        assert_eq!(chat.call_count(), 1);
    }

    #[tokio::test]
    async fn test_repeat_question_hits_rewrite_cache() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let index = Arc::new(MemoryVectorIndex::new());
        let embedder = Arc::new(HashEmbedder::new(8));
        seeded_corpus(&store, &index, &embedder).await;

        let chat = Arc::new(ScriptedChatModel::new(vec![
            "rust ownership",
            "first answer",
            "second answer",
        ]));
        let engine = engine(store, index, embedder, chat.clone());

        let first = engine
            .answer_question("what is ownership?", "", &[])
            .await
            .unwrap();
        let second = engine
            .answer_question("what is ownership?", "", &[])
            .await
            .unwrap();

        assert!(!first.rewrite_cached);
        assert!(second.rewrite_cached);
        assert_eq!(second.rewritten_query, "rust ownership");
        // Three calls total: one rewrite plus two answers.
        assert_eq!(chat.call_count(), 3);
    }

    #[tokio::test]
    async fn test_sources_follow_rerank_order() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let index = Arc::new(MemoryVectorIndex::new());
        let embedder = Arc::new(HashEmbedder::new(8));
        seeded_corpus(&store, &index, &embedder).await;

        // Force the rerank path by retaining fewer than the candidate count.
        let chat = Arc::new(ScriptedChatModel::new(vec![
            "rust ownership",
            "{\"keep\": [1, 0]}",
            "grounded answer",
        ]));
        let engine = AnswerEngine::new(
            store.clone(),
            index,
            embedder,
            chat.clone(),
            Arc::new(SqliteCache::in_memory().unwrap()),
            Prompts::default(),
            EngineConfig {
                namespace: NS.to_string(),
                fetch_k: 10,
                top_k: 2,
                rewrite_ttl: std::time::Duration::from_secs(60),
            },
        );

        let outcome = engine
            .answer_question("what is ownership?", "", &[])
            .await
            .unwrap();

        assert_eq!(outcome.answer, "grounded answer");
        assert_eq!(outcome.sources.len(), 2);
        assert_eq!(chat.call_count(), 3);
    }
}
