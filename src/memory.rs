//! Rolling conversation summaries.
//!
//! A chat session keeps one compact free-text summary, updated
//! incrementally from new turns and hard-capped in length regardless of
//! what the model returns.

use crate::config::Prompts;
use crate::error::Result;
use crate::llm::{format_turns, ChatMessage, ChatModel};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Default summary budget in characters.
pub const DEFAULT_SUMMARY_MAX_CHARS: usize = 1500;

/// Maintains the rolling summary for a conversation.
pub struct ConversationMemory {
    chat: Arc<dyn ChatModel>,
    prompts: Prompts,
}

impl ConversationMemory {
    pub fn new(chat: Arc<dyn ChatModel>, prompts: Prompts) -> Self {
        Self { chat, prompts }
    }

    /// Merge new turns into the summary.
    ///
    /// With no new messages the prior summary is returned unchanged and no
    /// model call is made. The output is truncated to `max_chars` at a word
    /// boundary whether or not the model respected the budget.
    pub async fn update_summary(
        &self,
        summary: &str,
        new_messages: &[ChatMessage],
        max_chars: usize,
    ) -> Result<String> {
        if new_messages.is_empty() {
            return Ok(summary.to_string());
        }

        let mut vars = HashMap::new();
        vars.insert("summary".to_string(), summary.to_string());
        vars.insert("new_messages".to_string(), format_turns(new_messages));
        vars.insert("max_chars".to_string(), max_chars.to_string());

        let system = self
            .prompts
            .render_with_custom(&self.prompts.summary.system, &vars);
        let user = self
            .prompts
            .render_with_custom(&self.prompts.summary.user, &vars);

        let out = self.chat.complete(&system, &user).await?;
        let out = out.trim();

        debug!("Updated summary ({} chars before cap)", out.len());
        Ok(truncate_at_word_boundary(out, max_chars))
    }
}

/// Cap `text` at `max_chars` characters, cutting at the last whitespace
/// boundary at or before the limit so no word is split.
pub fn truncate_at_word_boundary(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let cut: String = text.chars().take(max_chars).collect();
    match cut.rfind(char::is_whitespace) {
        Some(idx) => cut[..idx].trim_end().to_string(),
        None => cut,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::testing::ScriptedChatModel;

    #[tokio::test]
    async fn test_empty_messages_is_a_no_op() {
        let chat = Arc::new(ScriptedChatModel::new(vec!["should not be called"]));
        let memory = ConversationMemory::new(chat.clone(), Prompts::default());

        let out = memory.update_summary("prior summary", &[], 100).await.unwrap();
        assert_eq!(out, "prior summary");
        assert_eq!(chat.call_count(), 0);
    }

    #[tokio::test]
    async fn test_update_calls_model_once() {
        let chat = Arc::new(ScriptedChatModel::new(vec!["merged summary"]));
        let memory = ConversationMemory::new(chat.clone(), Prompts::default());

        let turns = vec![ChatMessage::user("tell me about chunking")];
        let out = memory.update_summary("", &turns, 100).await.unwrap();
        assert_eq!(out, "merged summary");
        assert_eq!(chat.call_count(), 1);
    }

    #[tokio::test]
    async fn test_output_is_capped_at_word_boundary() {
        let long = "alpha beta gamma delta epsilon zeta eta theta";
        let chat = Arc::new(ScriptedChatModel::new(vec![long]));
        let memory = ConversationMemory::new(chat, Prompts::default());

        let turns = vec![ChatMessage::user("q")];
        let out = memory.update_summary("", &turns, 20).await.unwrap();
        assert!(out.chars().count() <= 20);
        assert!(long.starts_with(out.as_str()));
        assert!(!out.ends_with(' '));
        // Never cut mid-word: the output must end exactly at a word end.
        assert_eq!(out, "alpha beta gamma");
    }

    #[test]
    fn test_truncate_short_text_unchanged() {
        assert_eq!(truncate_at_word_boundary("short", 100), "short");
    }

    #[test]
    fn test_truncate_exact_limit_unchanged() {
        assert_eq!(truncate_at_word_boundary("abcde", 5), "abcde");
    }

    #[test]
    fn test_truncate_without_whitespace_hard_cuts() {
        assert_eq!(truncate_at_word_boundary("abcdefghij", 4), "abcd");
    }

    #[test]
    fn test_truncate_multibyte_counts_chars_not_bytes() {
        let text = "grønn eple smak";
        let out = truncate_at_word_boundary(text, 8);
        assert!(out.chars().count() <= 8);
        assert_eq!(out, "grønn");
    }
}
