// Bounded-length summaries
//
// The word limit is an instruction to the model, not a guarantee. Every
// summary is re-counted here and flagged when it runs over.

use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};

use super::TextGenerator;
use crate::error::GenerationError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub text: String,
    pub word_count: usize,
    pub word_limit: usize,
    pub within_limit: bool,
}

impl Summary {
    fn new(text: String, word_limit: usize) -> Self {
        let word_count = count_words(&text);
        Self {
            text,
            word_count,
            word_limit,
            within_limit: word_count <= word_limit,
        }
    }
}

pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

pub fn summary_prompt(text: &str, word_limit: usize) -> String {
    format!(
        "Summarize the following text in exactly {n} words or fewer. \
         Include only the most essential details. Do NOT exceed {n} words:\n\n\
         {text}\n\n\
         Your response MUST be at most {n} words.",
        n = word_limit,
        text = text
    )
}

pub struct Summarizer<G: TextGenerator> {
    generator: Arc<G>,
    max_concurrency: usize,
}

impl<G: TextGenerator + 'static> Summarizer<G> {
    pub fn new(generator: Arc<G>, max_concurrency: usize) -> Self {
        Self {
            generator,
            max_concurrency: max_concurrency.max(1),
        }
    }

    pub async fn summarize(&self, text: &str, word_limit: usize) -> Result<Summary, GenerationError> {
        summarize_with(self.generator.as_ref(), text, word_limit).await
    }

    /// Summarize many texts with at most `max_concurrency` calls in flight.
    /// Results come back in input order, each with its own outcome.
    pub async fn summarize_batch(
        &self,
        texts: Vec<String>,
        word_limit: usize,
    ) -> Vec<Result<Summary, GenerationError>> {
        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let mut tasks = JoinSet::new();

        for (index, text) in texts.into_iter().enumerate() {
            let generator = Arc::clone(&self.generator);
            let semaphore = Arc::clone(&semaphore);
            tasks.spawn(async move {
                let result = match semaphore.acquire_owned().await {
                    Ok(_permit) => summarize_with(generator.as_ref(), &text, word_limit).await,
                    Err(e) => Err(GenerationError::Task(e.to_string())),
                };
                (index, result)
            });
        }

        let mut slots: Vec<Option<Result<Summary, GenerationError>>> = Vec::new();
        slots.resize_with(tasks.len(), || None);

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, result)) => slots[index] = Some(result),
                Err(e) => warn!("summary task aborted: {}", e),
            }
        }

        slots
            .into_iter()
            .map(|slot| slot.unwrap_or_else(|| Err(GenerationError::Task("task aborted".to_string()))))
            .collect()
    }
}

async fn summarize_with<G: TextGenerator + ?Sized>(
    generator: &G,
    text: &str,
    word_limit: usize,
) -> Result<Summary, GenerationError> {
    let raw = generator.generate(&summary_prompt(text, word_limit)).await?;
    let summary = Summary::new(raw.trim().to_string(), word_limit);
    if summary.within_limit {
        info!("Summary: {} words", summary.word_count);
    } else {
        warn!(
            "Summary has {} words, over the {} word limit",
            summary.word_count, summary.word_limit
        );
    }
    Ok(summary)
}
