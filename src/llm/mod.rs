//! LLM integration module

pub mod client;
pub mod parser;
pub mod prompts;

pub use client::ChatCompletionClient;
pub use parser::{CriterionScore, ParsedResponse, RegexResponseParser, ResponseParser, ScoreSource};
pub use prompts::PromptTemplates;

use crate::error::ScoringServiceError;
use async_trait::async_trait;

/// Opaque text-completion capability that judges a resume.
#[async_trait]
pub trait ScoringModel: Send + Sync {
    async fn predict(&self, prompt: &str) -> Result<String, ScoringServiceError>;

    fn model_name(&self) -> &str {
        "unknown"
    }
}
