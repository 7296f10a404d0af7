use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const MIN_SCORE: f64 = 0.0;
pub const MAX_SCORE: f64 = 10.0;

/// Clamps a finite score into [MIN_SCORE, MAX_SCORE]. Returns `None` for NaN/infinite input.
///
/// `-0.0` comes back as `0.0`, so equal scores also compare equal under `total_cmp`.
pub fn clamp_score(score: f64) -> Option<f64> {
    score
        .is_finite()
        .then(|| score.clamp(MIN_SCORE, MAX_SCORE) + 0.0)
}

/// A candidate's fit rating against the job description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    /// Always within [0, 10].
    pub score: f64,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub rationale: String,
}

impl Rating {
    /// Reads a rating from model output. `None` when the score is missing or not numeric.
    ///
    /// Numeric strings ("7.5") are accepted; out-of-range scores are clamped.
    pub fn from_model_output(value: &Value) -> Option<Self> {
        let score = score_value(value.get("score")?)?;
        Some(Self {
            score,
            strengths: string_list(value.get("strengths")),
            weaknesses: string_list(value.get("weaknesses")),
            rationale: value
                .get("rationale")
                .and_then(|v| v.as_str())
                .map(|s| s.trim().to_string())
                .unwrap_or_default(),
        })
    }
}

/// A rating re-scored by the consistency judge relative to its batch peers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JudgedRating {
    pub rating: Rating,
    /// Score of the initial rating this judgement started from.
    pub initial_score: f64,
    /// Why the score moved. Empty when unchanged.
    pub adjustment_rationale: String,
    /// Set when judging failed and the initial rating was carried forward unchanged.
    pub used_fallback: bool,
}

impl JudgedRating {
    /// Carries `initial` forward unchanged, flagged as a fallback.
    pub fn fallback(initial: &Rating, reason: impl Into<String>) -> Self {
        Self {
            rating: initial.clone(),
            initial_score: initial.score,
            adjustment_rationale: reason.into(),
            used_fallback: true,
        }
    }

    pub fn score(&self) -> f64 {
        self.rating.score
    }

    pub fn delta(&self) -> f64 {
        self.rating.score - self.initial_score
    }
}

/// Parses a score given as a JSON number or numeric string and clamps it.
pub(crate) fn score_value(value: &Value) -> Option<f64> {
    raw_score(value).and_then(clamp_score)
}

/// Reads a score given as a JSON number or numeric string, unclamped.
pub(crate) fn raw_score(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', ".").parse::<f64>().ok(),
        _ => None,
    }
}

/// Accepts a list of strings or a single string (split into lines).
pub(crate) fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect(),
        Some(Value::String(s)) => s
            .lines()
            .map(|l| l.trim().trim_start_matches(['-', '*', '•']).trim())
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_clamp_score_bounds() {
        assert_eq!(clamp_score(12.5), Some(10.0));
        assert_eq!(clamp_score(-3.0), Some(0.0));
        assert_eq!(clamp_score(7.25), Some(7.25));
        assert_eq!(clamp_score(f64::NAN), None);
        assert_eq!(clamp_score(f64::INFINITY), None);
    }

    #[test]
    fn test_clamp_score_drops_negative_zero() {
        let score = clamp_score(-0.0).unwrap();
        assert!(score.is_sign_positive());
        assert_eq!(score.total_cmp(&0.0), std::cmp::Ordering::Equal);
    }

    #[test]
    fn test_rating_from_model_output() {
        let value = json!({
            "score": 7.5,
            "strengths": ["Rust", "Distributed systems"],
            "weaknesses": "No cloud experience",
            "rationale": "Solid backend profile"
        });
        let rating = Rating::from_model_output(&value).unwrap();
        assert_eq!(rating.score, 7.5);
        assert_eq!(rating.strengths.len(), 2);
        assert_eq!(rating.weaknesses, vec!["No cloud experience".to_string()]);
        assert_eq!(rating.rationale, "Solid backend profile");
    }

    #[test]
    fn test_rating_accepts_numeric_string_with_comma() {
        let rating = Rating::from_model_output(&json!({ "score": "8,5" })).unwrap();
        assert_eq!(rating.score, 8.5);
    }

    #[test]
    fn test_rating_without_score_is_rejected() {
        assert!(Rating::from_model_output(&json!({ "rationale": "n/a" })).is_none());
        assert!(Rating::from_model_output(&json!({ "score": "high" })).is_none());
    }

    #[test]
    fn test_rating_score_is_clamped() {
        let rating = Rating::from_model_output(&json!({ "score": 14 })).unwrap();
        assert_eq!(rating.score, 10.0);
    }

    #[test]
    fn test_string_list_strips_bullets() {
        let list = string_list(Some(&json!("- Ships fast\n* Owns incidents\n\n")));
        assert_eq!(list, vec!["Ships fast", "Owns incidents"]);
    }

    #[test]
    fn test_fallback_keeps_initial_score() {
        let initial = Rating {
            score: 6.0,
            strengths: vec![],
            weaknesses: vec![],
            rationale: "ok".to_string(),
        };
        let judged = JudgedRating::fallback(&initial, "kept");
        assert!(judged.used_fallback);
        assert_eq!(judged.score(), 6.0);
        assert_eq!(judged.delta(), 0.0);
    }
}
