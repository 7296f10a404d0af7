use async_trait::async_trait;
use tracing::warn;

use crate::llm_client::prompts::fill_template;
use crate::llm_client::{InferenceClient, InferenceError};
use crate::models::StructuredProfile;
use crate::services::prompts::{EXTRACT_PROMPT_TEMPLATE, EXTRACT_SYSTEM};
use crate::services::ExtractionService;

pub struct LlmExtractor {
    client: InferenceClient,
}

impl LlmExtractor {
    pub fn new(client: InferenceClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ExtractionService for LlmExtractor {
    async fn extract(&self, text: &str) -> Result<StructuredProfile, InferenceError> {
        let prompt = fill_template(EXTRACT_PROMPT_TEMPLATE, &[("cv_text", text)]);
        let profile = self
            .client
            .send_with(&prompt, EXTRACT_SYSTEM, |value| {
                if !value.is_object() {
                    return Err("expected a JSON object".to_string());
                }
                Ok(StructuredProfile::from_extraction(&value))
            })
            .await?;
        if profile.is_empty() {
            warn!("Extraction returned no usable profile fields");
        }
        Ok(profile)
    }
}
