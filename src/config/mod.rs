//! Configuration management for Svar.

mod prompts;
mod settings;

pub use prompts::{AnswerPrompts, Prompts, RerankPrompts, RewritePrompts, SummaryPrompts};
pub use settings::{
    CacheSettings, ChunkingSettings, EmbeddingSettings, GeneralSettings, IndexSettings,
    ModelSettings, PromptSettings, RetrievalSettings, Settings, StoreSettings,
};
