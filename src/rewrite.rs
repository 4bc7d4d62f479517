//! Conversation-aware query rewriting.
//!
//! The same literal question can need different rewrites depending on the
//! conversation ("what about the second one?"), so the cache key folds in
//! hashes of the summary, the recent turns, and the question. Keys carry
//! only hashes, never raw user content.

use crate::cache::Cache;
use crate::config::Prompts;
use crate::error::Result;
use crate::hash::sha256_hex;
use crate::llm::{format_turns, ChatMessage, ChatModel};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Cached rewrite payload.
#[derive(Debug, Serialize, Deserialize)]
struct CachedRewrite {
    q: String,
}

/// Rewrites follow-up questions into standalone retrieval queries.
pub struct QueryRewriter {
    chat: Arc<dyn ChatModel>,
    cache: Arc<dyn Cache>,
    prompts: Prompts,
    ttl: Duration,
}

impl QueryRewriter {
    pub fn new(
        chat: Arc<dyn ChatModel>,
        cache: Arc<dyn Cache>,
        prompts: Prompts,
        ttl: Duration,
    ) -> Self {
        Self {
            chat,
            cache,
            prompts,
            ttl,
        }
    }

    /// Rewrite a question using conversation context.
    ///
    /// Returns the rewritten query and whether it was served from cache.
    pub async fn rewrite(
        &self,
        question: &str,
        namespace: &str,
        summary: &str,
        recent_turns: &[ChatMessage],
    ) -> Result<(String, bool)> {
        let key = cache_key(namespace, summary, recent_turns, question);

        if let Some(raw) = self.cache.get(&key).await {
            match serde_json::from_str::<CachedRewrite>(&raw) {
                Ok(cached) => {
                    debug!("Rewrite cache hit");
                    return Ok((cached.q, true));
                }
                Err(e) => warn!("Discarding undecodable cache entry: {}", e),
            }
        }

        let recent = format_turns(recent_turns);
        let mut vars = HashMap::new();
        vars.insert("summary".to_string(), summary.to_string());
        vars.insert(
            "recent".to_string(),
            if recent.is_empty() {
                "(none)".to_string()
            } else {
                recent
            },
        );
        vars.insert("question".to_string(), question.to_string());

        let system = self
            .prompts
            .render_with_custom(&self.prompts.rewrite.system, &vars);
        let user = self
            .prompts
            .render_with_custom(&self.prompts.rewrite.user, &vars);

        let out = self.chat.complete(&system, &user).await?.trim().to_string();

        let payload = serde_json::to_string(&CachedRewrite { q: out.clone() })?;
        self.cache.set(&key, &payload, self.ttl).await;

        Ok((out, false))
    }
}

/// Build the cache key for a rewrite.
///
/// Every semantically relevant input is hashed in: identical
/// `(namespace, summary, recent turns, question)` always produce the same
/// key, and any difference produces a different one. This is what keeps one
/// session's follow-up resolution from leaking into another's.
pub fn cache_key(
    namespace: &str,
    summary: &str,
    recent_turns: &[ChatMessage],
    question: &str,
) -> String {
    format!(
        "rewrite:{}:{}:{}:{}",
        namespace,
        sha256_hex(summary),
        sha256_hex(&serialize_turns(recent_turns)),
        sha256_hex(question)
    )
}

/// Stable serialization of turns for key hashing.
fn serialize_turns(turns: &[ChatMessage]) -> String {
    turns
        .iter()
        .map(|m| format!("{}:{}", m.role, m.content))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{NoopCache, SqliteCache};
    use crate::llm::testing::ScriptedChatModel;

    const TTL: Duration = Duration::from_secs(60);

    #[test]
    fn test_cache_key_is_stable_and_context_sensitive() {
        let turns = vec![ChatMessage::user("first"), ChatMessage::assistant("reply")];

        let base = cache_key("ns", "summary", &turns, "question");
        assert_eq!(base, cache_key("ns", "summary", &turns, "question"));
        assert!(base.starts_with("rewrite:ns:"));

        // Any input changing changes the key.
        assert_ne!(base, cache_key("other", "summary", &turns, "question"));
        assert_ne!(base, cache_key("ns", "changed", &turns, "question"));
        assert_ne!(base, cache_key("ns", "summary", &[], "question"));
        assert_ne!(base, cache_key("ns", "summary", &turns, "other question"));
    }

    #[test]
    fn test_cache_key_contains_no_raw_content() {
        let turns = vec![ChatMessage::user("secret plans")];
        let key = cache_key("ns", "secret summary", &turns, "secret question");
        assert!(!key.contains("secret"));
    }

    #[tokio::test]
    async fn test_second_identical_call_hits_cache() {
        let chat = Arc::new(ScriptedChatModel::new(vec!["rewritten query"]));
        let cache = Arc::new(SqliteCache::in_memory().unwrap());
        let rewriter = QueryRewriter::new(chat.clone(), cache, Prompts::default(), TTL);

        let turns = vec![ChatMessage::user("tell me about ingestion")];

        let (q1, cached1) = rewriter
            .rewrite("what about errors?", "ns", "sum", &turns)
            .await
            .unwrap();
        assert_eq!(q1, "rewritten query");
        assert!(!cached1);

        let (q2, cached2) = rewriter
            .rewrite("what about errors?", "ns", "sum", &turns)
            .await
            .unwrap();
        assert_eq!(q2, "rewritten query");
        assert!(cached2);
        assert_eq!(chat.call_count(), 1);
    }

    #[tokio::test]
    async fn test_changed_recent_turns_misses_cache() {
        let chat = Arc::new(ScriptedChatModel::new(vec!["first rewrite", "second rewrite"]));
        let cache = Arc::new(SqliteCache::in_memory().unwrap());
        let rewriter = QueryRewriter::new(chat.clone(), cache, Prompts::default(), TTL);

        let turns_a = vec![ChatMessage::user("about chunking")];
        let turns_b = vec![ChatMessage::user("about caching")];

        let (_, cached1) = rewriter
            .rewrite("why?", "ns", "sum", &turns_a)
            .await
            .unwrap();
        let (q2, cached2) = rewriter.rewrite("why?", "ns", "sum", &turns_b).await.unwrap();

        assert!(!cached1);
        assert!(!cached2);
        assert_eq!(q2, "second rewrite");
        assert_eq!(chat.call_count(), 2);
    }

    #[tokio::test]
    async fn test_noop_cache_always_regenerates() {
        let chat = Arc::new(ScriptedChatModel::new(vec!["one", "two"]));
        let rewriter =
            QueryRewriter::new(chat.clone(), Arc::new(NoopCache), Prompts::default(), TTL);

        let (q1, cached1) = rewriter.rewrite("q", "ns", "", &[]).await.unwrap();
        let (q2, cached2) = rewriter.rewrite("q", "ns", "", &[]).await.unwrap();

        assert!(!cached1);
        assert!(!cached2);
        assert_eq!(q1, "one");
        assert_eq!(q2, "two");
        assert_eq!(chat.call_count(), 2);
    }
}
