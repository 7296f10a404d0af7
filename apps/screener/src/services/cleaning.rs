use async_trait::async_trait;
use tracing::debug;

use crate::llm_client::prompts::fill_template;
use crate::llm_client::{InferenceClient, InferenceError};
use crate::services::prompts::{CLEAN_PROMPT_TEMPLATE, CLEAN_SYSTEM};
use crate::services::CleaningService;

pub struct LlmCleaner {
    client: InferenceClient,
}

impl LlmCleaner {
    pub fn new(client: InferenceClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CleaningService for LlmCleaner {
    async fn clean(&self, text: &str) -> Result<String, InferenceError> {
        let prompt = fill_template(CLEAN_PROMPT_TEMPLATE, &[("text", text)]);
        let cleaned = self.client.send_text(&prompt, CLEAN_SYSTEM).await?;
        debug!(
            "cleaned document: {} -> {} chars",
            text.chars().count(),
            cleaned.chars().count()
        );
        Ok(cleaned)
    }
}
