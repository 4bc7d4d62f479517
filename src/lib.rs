//! Svar - Grounded Question Answering over Video Transcripts
//!
//! The retrieval core of a conversational question-answering pipeline. The
//! name "Svar" comes from the Norwegian/Scandinavian word for "answer."
//!
//! # Overview
//!
//! Svar lets you:
//! - Ingest video transcripts into a content-addressed chunk store and a
//!   vector index, idempotently (repeated runs skip completed work)
//! - Rewrite follow-up questions into standalone search queries using
//!   conversation context, with cache-backed memoization
//! - Retrieve, rerank, and assemble grounded context with timestamped
//!   source citations
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `config` - Configuration and prompt management
//! - `transcript` - Transcript segment model and acquisition driver
//! - `chunking` - Overlapping character-window chunking with stable ids
//! - `store` - Relational store (videos, chunks, ingestion ledger)
//! - `vector_index` - Vector index abstraction
//! - `cache` - Optional TTL cache with silent degradation
//! - `embedding` - Embedding generation
//! - `llm` - Chat model abstraction
//! - `memory` - Rolling conversation summaries
//! - `rewrite` - Conversation-aware query rewriting
//! - `rerank` - LLM-based candidate reranking
//! - `ingest` - Idempotent ingestion pipeline
//! - `rag` - Retrieval orchestration and answer assembly
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use svar::cache;
//! use svar::config::{Prompts, Settings};
//! use svar::embedding::OpenAIEmbedder;
//! use svar::llm::OpenAIChatModel;
//! use svar::rag::{AnswerEngine, EngineConfig};
//! use svar::store::SqliteStore;
//! use svar::vector_index::SqliteVectorIndex;
//!
//! #[tokio::main]
//! async fn main() -> svar::Result<()> {
//!     tracing_subscriber::fmt()
//!         .with_env_filter("svar=info")
//!         .init();
//!
//!     let settings = Settings::load()?;
//!     let prompts = Prompts::load(None, Some(&settings.prompts.variables))?;
//!
//!     let store = Arc::new(SqliteStore::new(&settings.store_path())?);
//!     let index = Arc::new(SqliteVectorIndex::ensure(
//!         &settings.index_path(),
//!         &settings.index.name,
//!         settings.embedding.dimensions as usize,
//!         &settings.index.metric,
//!     )?);
//!     let embedder = Arc::new(OpenAIEmbedder::with_config(
//!         &settings.embedding.model,
//!         settings.embedding.dimensions as usize,
//!     ));
//!     let chat = Arc::new(OpenAIChatModel::new(&settings.models.chat_model));
//!     let cache = cache::from_settings(&settings.cache);
//!
//!     let engine = AnswerEngine::new(
//!         store,
//!         index,
//!         embedder,
//!         chat,
//!         cache,
//!         prompts,
//!         EngineConfig::from_settings(&settings),
//!     );
//!
//!     let outcome = engine.answer_question("What is covered?", "", &[]).await?;
//!     println!("{}", outcome.answer);
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod chunking;
pub mod config;
pub mod embedding;
pub mod error;
pub mod hash;
pub mod ingest;
pub mod llm;
pub mod memory;
pub mod openai;
pub mod rag;
pub mod rerank;
pub mod rewrite;
pub mod store;
pub mod transcript;
pub mod vector_index;

pub use error::{Result, SvarError};
