/// System prompt for batch re-scoring.
pub const JUDGE_SYSTEM: &str = "You are an expert technical recruitment judge. \
    Re-evaluate a group of candidates together so that their scores are fair and \
    consistent with each other. Keep the 0-10 scale.";

/// Judge prompt template. Replace `{job_description}`, `{count}` and `{candidates}`.
pub const JUDGE_PROMPT_TEMPLATE: &str = r#"Re-evaluate the candidates below against the job description.

JOB DESCRIPTION:
{job_description}

CANDIDATES:
{candidates}

Instructions:
1. Compare all candidates with each other to make the scores consistent.
2. Adjust scores only where needed to reflect real differences.
3. Consider each candidate's full context.
4. Keep the 0-10 scale.
5. Explain every adjustment.

Return a JSON array with exactly {count} objects, one per candidate, each tagged with the
candidate_id given above:
[
  {
    "candidate_id": "the id exactly as given",
    "score": 7.5,
    "strengths": ["short strength"],
    "weaknesses": ["short weakness"],
    "rationale": "justification of the score",
    "score_adjustment": "why the score moved, or an empty string when unchanged"
  }
]"#;

/// Block for one candidate inside the judge prompt.
pub const CANDIDATE_BLOCK_TEMPLATE: &str = r#"--- candidate_id: {id} ---
{profile}
Initial score: {score}
Strengths: {strengths}
Weaknesses: {weaknesses}
Rationale: {rationale}"#;
