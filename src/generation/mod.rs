// Text generation boundary: question answering and summaries
pub mod ollama;
pub mod question_answering;
pub mod summarization;

pub use ollama::OllamaClient;
pub use question_answering::{question_prompt, QuestionAnswerer};
pub use summarization::{count_words, summary_prompt, Summarizer, Summary};

use async_trait::async_trait;

use crate::error::GenerationError;

/// Prompt in, text out. Implementations must return remote failures as
/// errors, never as an empty or made-up reply.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}
