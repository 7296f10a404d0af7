use async_trait::async_trait;

use crate::llm_client::prompts::{
    fill_template, list_or_unknown, or_unknown, UNTRUSTED_INPUT_INSTRUCTION,
};
use crate::llm_client::{InferenceClient, InferenceError};
use crate::models::{Rating, StructuredProfile};
use crate::services::prompts::{RATE_PROMPT_TEMPLATE, RATE_SYSTEM};
use crate::services::RatingService;

pub struct LlmRater {
    client: InferenceClient,
}

impl LlmRater {
    pub fn new(client: InferenceClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RatingService for LlmRater {
    async fn rate(
        &self,
        profile: &StructuredProfile,
        job_description: &str,
    ) -> Result<Rating, InferenceError> {
        let prompt = format!(
            "{}\n\n{}",
            fill_template(
                RATE_PROMPT_TEMPLATE,
                &[
                    ("job_description", job_description),
                    ("candidate", &render_profile(profile)),
                ],
            ),
            UNTRUSTED_INPUT_INSTRUCTION
        );
        self.client
            .send_with(&prompt, RATE_SYSTEM, |value| {
                Rating::from_model_output(&value)
                    .ok_or_else(|| "rating has no numeric score".to_string())
            })
            .await
    }
}

/// Renders a profile as a prompt block. Absent fields read "not provided".
pub fn render_profile(profile: &StructuredProfile) -> String {
    format!(
        "Name: {}\nEmail: {}\nPhone: {}\nLanguages: {}\nProgramming languages: {}\n\
         Frameworks: {}\nYears of experience: {}\nEducation: {}\nSummary: {}",
        or_unknown(profile.name.as_deref()),
        or_unknown(profile.email.as_deref()),
        or_unknown(profile.phone.as_deref()),
        list_or_unknown(profile.languages.as_deref()),
        list_or_unknown(profile.programming_languages.as_deref()),
        list_or_unknown(profile.frameworks.as_deref()),
        or_unknown(profile.years_experience),
        or_unknown(profile.education.as_deref()),
        or_unknown(profile.summary.as_deref()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::testing::{Scripted, ScriptedBackend};
    use crate::llm_client::ClientPolicy;
    use std::sync::Arc;

    #[test]
    fn test_render_profile_marks_absent_fields() {
        let profile = StructuredProfile {
            name: Some("Jane Doe".into()),
            frameworks: Some(vec![]),
            ..Default::default()
        };
        let block = render_profile(&profile);
        assert!(block.contains("Name: Jane Doe"));
        assert!(block.contains("Email: not provided"));
        assert!(block.contains("Frameworks: none"));
        assert!(block.contains("Years of experience: not provided"));
    }

    #[tokio::test]
    async fn test_rate_parses_and_clamps() {
        let backend = Arc::new(ScriptedBackend::new(vec![Scripted::Reply(
            r#"{"score": 11, "strengths": ["Rust"], "weaknesses": [], "rationale": "great"}"#
                .into(),
        )]));
        let rater = LlmRater::new(InferenceClient::new(backend, ClientPolicy::default()));
        let rating = rater
            .rate(&StructuredProfile::default(), "Rust engineer")
            .await
            .unwrap();
        assert_eq!(rating.score, 10.0);
        assert_eq!(rating.strengths, vec!["Rust".to_string()]);
    }
}
