//! LLM-based candidate reranking.
//!
//! The model is asked to pick a subset of candidate indices; its output is
//! validated strictly and any malformed reply degrades to a deterministic
//! head-of-list selection. Reranking never fails the request.

use crate::config::Prompts;
use crate::llm::ChatModel;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// The only reply shape accepted from the model.
#[derive(Debug, Deserialize)]
struct KeepSelection {
    keep: Vec<i64>,
}

/// Reranks retrieval candidates down to `top_k`.
pub struct Reranker {
    chat: Arc<dyn ChatModel>,
    prompts: Prompts,
}

impl Reranker {
    pub fn new(chat: Arc<dyn ChatModel>, prompts: Prompts) -> Self {
        Self { chat, prompts }
    }

    /// Select up to `top_k` candidate indices, best first.
    ///
    /// Fast paths skip the model entirely: no candidates yields no indices,
    /// and a candidate list already within `top_k` is kept as-is. Otherwise
    /// one model call selects a subset; on any malformed output the first
    /// `top_k` indices are kept in original order.
    pub async fn rerank(&self, question: &str, candidates: &[String], top_k: usize) -> Vec<usize> {
        if candidates.is_empty() {
            return Vec::new();
        }
        if candidates.len() <= top_k {
            return (0..candidates.len()).collect();
        }

        let numbered = candidates
            .iter()
            .enumerate()
            .map(|(i, c)| format!("[{}] {}", i, c))
            .collect::<Vec<_>>()
            .join("\n\n");

        let mut vars = HashMap::new();
        vars.insert("question".to_string(), question.to_string());
        vars.insert("candidates".to_string(), numbered);
        vars.insert("top_k".to_string(), top_k.to_string());

        let system = self
            .prompts
            .render_with_custom(&self.prompts.rerank.system, &vars);
        let user = self
            .prompts
            .render_with_custom(&self.prompts.rerank.user, &vars);

        let raw = match self.chat.complete(&system, &user).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Rerank call failed, keeping original order: {}", e);
                return fallback(candidates.len(), top_k);
            }
        };

        match parse_selection(&raw) {
            Some(selection) => {
                let kept = sanitize_indices(&selection.keep, candidates.len(), top_k);
                if kept.is_empty() {
                    debug!("Rerank selection empty after filtering, falling back");
                    fallback(candidates.len(), top_k)
                } else {
                    kept
                }
            }
            None => {
                warn!(
                    "Unparseable rerank output, keeping original order: {}",
                    &raw[..raw.len().min(200)]
                );
                fallback(candidates.len(), top_k)
            }
        }
    }
}

/// Deterministic fallback: the first `top_k` indices in original order.
fn fallback(n_candidates: usize, top_k: usize) -> Vec<usize> {
    (0..n_candidates.min(top_k)).collect()
}

/// Extract and strictly deserialize the JSON object from the model reply.
///
/// Models wrap JSON in prose or code fences often enough that we scan for
/// the outermost braces first; everything after that is strict typed
/// deserialization, and any failure is the caller's signal to fall back.
fn parse_selection(response: &str) -> Option<KeepSelection> {
    let start = response.find('{')?;
    let end = response.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&response[start..=end]).ok()
}

/// Clamp to valid indices, drop duplicates keeping first occurrence, cap at `top_k`.
fn sanitize_indices(keep: &[i64], n_candidates: usize, top_k: usize) -> Vec<usize> {
    let mut out: Vec<usize> = Vec::new();
    for &raw in keep {
        let Ok(idx) = usize::try_from(raw) else {
            continue;
        };
        if idx < n_candidates && !out.contains(&idx) {
            out.push(idx);
        }
        if out.len() == top_k {
            break;
        }
    }
    out
}
