use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use crate::judge::prompts::{CANDIDATE_BLOCK_TEMPLATE, JUDGE_PROMPT_TEMPLATE, JUDGE_SYSTEM};
use crate::llm_client::prompts::{
    fill_template, list_or_unknown, JSON_ONLY_SYSTEM, UNTRUSTED_INPUT_INSTRUCTION,
};
use crate::llm_client::{InferenceClient, InferenceError};
use crate::models::rating::{raw_score, string_list};
use crate::models::{CandidateId, Rating, StructuredProfile};
use crate::services::render_profile;

/// One rated candidate handed to the judge.
#[derive(Debug, Clone, PartialEq)]
pub struct JudgeCandidate {
    pub id: CandidateId,
    pub profile: StructuredProfile,
    pub rating: Rating,
}

/// One entry of a judge response, before reconciliation.
///
/// `score` is the raw number the judge gave (unclamped). Text fields are `None` when the
/// judge left them out.
#[derive(Debug, Clone, PartialEq)]
pub struct JudgedEntry {
    pub candidate_id: CandidateId,
    pub score: Option<f64>,
    pub strengths: Option<Vec<String>>,
    pub weaknesses: Option<Vec<String>>,
    pub rationale: Option<String>,
    pub adjustment: Option<String>,
}

impl JudgedEntry {
    /// Entry with a score and nothing else. Handy for fakes.
    pub fn scored(candidate_id: CandidateId, score: f64) -> Self {
        Self {
            candidate_id,
            score: Some(score),
            strengths: None,
            weaknesses: None,
            rationale: None,
            adjustment: None,
        }
    }
}

/// Re-scores one batch of candidates relative to each other.
#[async_trait]
pub trait JudgingService: Send + Sync {
    async fn judge_batch(
        &self,
        batch: &[JudgeCandidate],
        job_description: &str,
    ) -> Result<Vec<JudgedEntry>, InferenceError>;
}

// ────────────────────────────────────────────────────────────────────────────
// LLM-backed judge
// ────────────────────────────────────────────────────────────────────────────

pub struct LlmJudge {
    client: InferenceClient,
}

impl LlmJudge {
    pub fn new(client: InferenceClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl JudgingService for LlmJudge {
    async fn judge_batch(
        &self,
        batch: &[JudgeCandidate],
        job_description: &str,
    ) -> Result<Vec<JudgedEntry>, InferenceError> {
        let blocks: Vec<String> = batch.iter().map(candidate_block).collect();
        let prompt = format!(
            "{}\n\n{}",
            fill_template(
                JUDGE_PROMPT_TEMPLATE,
                &[
                    ("job_description", job_description),
                    ("count", &batch.len().to_string()),
                    ("candidates", &blocks.join("\n\n")),
                ],
            ),
            UNTRUSTED_INPUT_INSTRUCTION
        );
        let system = format!("{JUDGE_SYSTEM} {JSON_ONLY_SYSTEM}");

        self.client
            .send_with(&prompt, &system, parse_entries)
            .await
    }
}

fn candidate_block(candidate: &JudgeCandidate) -> String {
    let rating = &candidate.rating;
    let rationale = if rating.rationale.is_empty() {
        "not provided"
    } else {
        rating.rationale.as_str()
    };
    fill_template(
        CANDIDATE_BLOCK_TEMPLATE,
        &[
            ("id", &candidate.id.to_string()),
            ("profile", &render_profile(&candidate.profile)),
            ("score", &rating.score.to_string()),
            ("strengths", &list_or_unknown(Some(rating.strengths.as_slice()))),
            ("weaknesses", &list_or_unknown(Some(rating.weaknesses.as_slice()))),
            ("rationale", rationale),
        ],
    )
}

/// Accepts a bare array, an object wrapping the array under `ratings` or `candidates`,
/// or a single entry object. Every entry must carry a parseable `candidate_id`.
fn parse_entries(value: Value) -> Result<Vec<JudgedEntry>, String> {
    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => {
            match map.remove("ratings").or_else(|| map.remove("candidates")) {
                Some(Value::Array(items)) => items,
                Some(_) => return Err("wrapped judge entries are not an array".to_string()),
                None => vec![Value::Object(map)],
            }
        }
        other => return Err(format!("unexpected judge response: {other}")),
    };
    items.iter().map(parse_entry).collect()
}

fn parse_entry(item: &Value) -> Result<JudgedEntry, String> {
    let raw_id = item
        .get("candidate_id")
        .and_then(|v| v.as_str())
        .ok_or_else(|| "judge entry without candidate_id".to_string())?;
    let uuid = Uuid::parse_str(raw_id.trim())
        .map_err(|e| format!("judge entry with invalid candidate_id {raw_id:?}: {e}"))?;

    let text = |key: &str| {
        item.get(key)
            .and_then(|v| v.as_str())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    };
    let list = |key: &str| {
        item.get(key)
            .filter(|v| !v.is_null())
            .map(|v| string_list(Some(v)))
            .filter(|l| !l.is_empty())
    };

    Ok(JudgedEntry {
        candidate_id: CandidateId::from(uuid),
        score: item.get("score").and_then(raw_score),
        strengths: list("strengths"),
        weaknesses: list("weaknesses"),
        rationale: text("rationale"),
        adjustment: text("score_adjustment"),
    })
}
