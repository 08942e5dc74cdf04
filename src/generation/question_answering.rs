// Question answering over an extracted corpus
use std::sync::Arc;
use tracing::info;

use super::TextGenerator;
use crate::error::GenerationError;

pub fn question_prompt(context: &str, question: &str) -> String {
    format!("Context: {}\n\nQuestion: {}\n\nAnswer:", context, question)
}

pub struct QuestionAnswerer<G: TextGenerator> {
    generator: Arc<G>,
}

impl<G: TextGenerator> QuestionAnswerer<G> {
    pub fn new(generator: Arc<G>) -> Self {
        Self { generator }
    }

    /// A remote failure is returned as-is, never as a placeholder answer.
    pub async fn answer(&self, context: &str, question: &str) -> Result<String, GenerationError> {
        info!("Asking: {}", question);
        let answer = self.generator.generate(&question_prompt(context, question)).await?;
        Ok(answer.trim().to_string())
    }

    /// Ask each question in turn against the same context. One failed
    /// question does not stop the rest.
    pub async fn answer_all(
        &self,
        context: &str,
        questions: &[String],
    ) -> Vec<(String, Result<String, GenerationError>)> {
        let mut answers = Vec::with_capacity(questions.len());
        for question in questions {
            let answer = self.answer(context, question).await;
            answers.push((question.clone(), answer));
        }
        answers
    }
}
