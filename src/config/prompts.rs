//! Prompt templates for Svar.
//!
//! Prompts can be customized by placing TOML files in the custom prompts directory.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Prompts {
    pub summary: SummaryPrompts,
    pub rewrite: RewritePrompts,
    pub rerank: RerankPrompts,
    pub answer: AnswerPrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: std::collections::HashMap<String, String>,
}


/// Prompts for conversation summary updates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryPrompts {
    pub system: String,
    pub user: String,
}

impl Default for SummaryPrompts {
    fn default() -> Self {
        Self {
            system: r#"You maintain a compact conversation summary for a video-grounded chatbot.
Update the summary using the new messages. Keep it short (max {{max_chars}} characters).
Include: user goals, entities, and unresolved questions.
Do NOT invent facts. If unsure, omit.
Return ONLY the updated summary text."#
                .to_string(),

            user: r#"Current summary:
{{summary}}

New messages:
{{new_messages}}

Updated summary:"#
                .to_string(),
        }
    }
}

/// Prompts for conversational query rewriting.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RewritePrompts {
    pub system: String,
    pub user: String,
}

impl Default for RewritePrompts {
    fn default() -> Self {
        Self {
            system: r#"Rewrite the user question into a clean, specific search query for retrieving relevant transcript passages.
Use the conversation summary + recent turns to resolve pronouns and follow-ups.
Return ONLY the rewritten query text."#
                .to_string(),

            user: r#"Conversation summary:
{{summary}}

Recent turns:
{{recent}}

User question:
{{question}}

Rewritten search query:"#
                .to_string(),
        }
    }
}

/// Prompts for candidate reranking.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RerankPrompts {
    pub system: String,
    pub user: String,
}

impl Default for RerankPrompts {
    fn default() -> Self {
        Self {
            system: r#"You are a reranking model. Given a question and candidate passages, select the best passages for answering.
Return a JSON object ONLY with key 'keep' as an array of integer indices (0-based), length up to {{top_k}}.
Choose passages that are most directly relevant and non-redundant."#
                .to_string(),

            user: r#"Question:
{{question}}

Candidates:
{{candidates}}

Return JSON only."#
                .to_string(),
        }
    }
}

/// Prompts for grounded answer generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnswerPrompts {
    pub system: String,
    pub user: String,
}

impl Default for AnswerPrompts {
    fn default() -> Self {
        Self {
            system: r#"You are a helpful assistant that answers questions using transcript passages from videos.

Guidelines:
- Answer using only the provided passages
- Cite sources as [video @ seconds] using the passage labels
- If the passages do not contain the answer, say so clearly
- Be concise but thorough
- When multiple passages are relevant, synthesize across them"#
                .to_string(),

            user: r#"Question: {{question}}

Relevant transcript passages:

{{context}}

Please answer the question based on the above passages."#
                .to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts from the default location, with optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&std::collections::HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let summary_path = custom_path.join("summary.toml");
            if summary_path.exists() {
                let content = std::fs::read_to_string(&summary_path)?;
                prompts.summary = toml::from_str(&content)?;
            }

            let rewrite_path = custom_path.join("rewrite.toml");
            if rewrite_path.exists() {
                let content = std::fs::read_to_string(&rewrite_path)?;
                prompts.rewrite = toml::from_str(&content)?;
            }

            let rerank_path = custom_path.join("rerank.toml");
            if rerank_path.exists() {
                let content = std::fs::read_to_string(&rerank_path)?;
                prompts.rerank = toml::from_str(&content)?;
            }

            let answer_path = custom_path.join("answer.toml");
            if answer_path.exists() {
                let content = std::fs::read_to_string(&answer_path)?;
                prompts.answer = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    pub fn render(template: &str, vars: &std::collections::HashMap<String, String>) -> String {
        let mut result = template.to_string();
        for (key, value) in vars {
            result = result.replace(&format!("{{{{{}}}}}", key), value);
        }
        result
    }

    /// Render a prompt template with both provided variables and custom config variables.
    /// Provided variables take precedence over custom config variables.
    pub fn render_with_custom(
        &self,
        template: &str,
        vars: &std::collections::HashMap<String, String>,
    ) -> String {
        let mut merged = self.variables.clone();
        for (key, value) in vars {
            merged.insert(key.clone(), value.clone());
        }
        Self::render(template, &merged)
    }
}
