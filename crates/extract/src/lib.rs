pub mod llm;
pub mod normalizer;
pub mod prompt;
pub mod schema;

pub use llm::{ChatModel, GroqClient};
pub use normalizer::{ParseError, parse_completion};
pub use schema::{
    CONTACT_INFO, CONTACT_KEYS, EXTRACTION_FAILED, ExtractionRecord, FIELDS, NOT_SPECIFIED,
};

use anyhow::{Context, Result};
use tracing::info;

/// Prompts the language model once and normalizes its answer.
pub struct Extractor {
    model: Box<dyn ChatModel>,
}

impl Extractor {
    pub fn new(model: Box<dyn ChatModel>) -> Self {
        Self { model }
    }

    /// Extract the bid record from retrieved context text.
    pub async fn extract_from_context(&self, context: &str) -> Result<ExtractionRecord> {
        let prompt = prompt::build_extraction_prompt(context);

        let completion = self
            .model
            .complete(&prompt)
            .await
            .context("Failed to get completion from language model")?;

        let record =
            parse_completion(&completion).context("Failed to parse extraction result")?;

        info!(fields = record.field_count(), "Extracted {} fields", record.field_count());
        Ok(record)
    }
}
