// Per-candidate inference services: cleaning, extraction, rating.
// Each is a trait so the orchestrator can run against any backend; the Llm* structs are
// the production implementations. All LLM calls go through llm_client::InferenceClient.

use async_trait::async_trait;

use crate::llm_client::InferenceError;
use crate::models::{Rating, StructuredProfile};

pub mod cleaning;
pub mod extraction;
pub mod prompts;
pub mod rating;

pub use cleaning::LlmCleaner;
pub use extraction::LlmExtractor;
pub use rating::{render_profile, LlmRater};

/// Strips injected, biased or irrelevant content from a document before extraction.
#[async_trait]
pub trait CleaningService: Send + Sync {
    async fn clean(&self, text: &str) -> Result<String, InferenceError>;
}

/// Turns CV text into a `StructuredProfile`.
#[async_trait]
pub trait ExtractionService: Send + Sync {
    async fn extract(&self, text: &str) -> Result<StructuredProfile, InferenceError>;
}

/// Rates one candidate in isolation against the job description.
#[async_trait]
pub trait RatingService: Send + Sync {
    async fn rate(
        &self,
        profile: &StructuredProfile,
        job_description: &str,
    ) -> Result<Rating, InferenceError>;
}
