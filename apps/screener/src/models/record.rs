use serde::{Deserialize, Serialize};

use crate::models::candidate::{CandidateId, StructuredProfile};
use crate::models::rating::{JudgedRating, Rating};
use crate::stage::{Stage, StageFailure};

/// The final merged view of one candidate.
///
/// Produced by the combiner for every ingested `CandidateId`, regardless of how many
/// stages failed for it. Absent parts stay `None`; the reason is kept in `failures`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateRecord {
    pub id: CandidateId,
    pub file_name: String,
    /// Position of the document at ingestion. Used as the sort tie-break.
    pub ingestion_index: usize,
    pub profile: Option<StructuredProfile>,
    pub initial_rating: Option<Rating>,
    pub judged_rating: Option<JudgedRating>,
    pub failures: Vec<RecordedFailure>,
}

/// A per-stage failure kept on the record for auditability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordedFailure {
    pub stage: Stage,
    pub failure: StageFailure,
}

/// The rating a record is ranked by.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FinalRating<'a> {
    Judged(&'a JudgedRating),
    /// Judging did not run for this candidate; the initial rating stands.
    Initial(&'a Rating),
    NotRated,
}

impl FinalRating<'_> {
    /// Score used for ranking. `NotRated` sorts below every real score.
    pub fn sort_key(&self) -> f64 {
        match self {
            FinalRating::Judged(j) => j.score(),
            FinalRating::Initial(r) => r.score,
            FinalRating::NotRated => f64::NEG_INFINITY,
        }
    }

    pub fn score(&self) -> Option<f64> {
        match self {
            FinalRating::Judged(j) => Some(j.score()),
            FinalRating::Initial(r) => Some(r.score),
            FinalRating::NotRated => None,
        }
    }
}

impl CandidateRecord {
    pub fn final_rating(&self) -> FinalRating<'_> {
        match (&self.judged_rating, &self.initial_rating) {
            (Some(judged), _) => FinalRating::Judged(judged),
            (None, Some(initial)) => FinalRating::Initial(initial),
            (None, None) => FinalRating::NotRated,
        }
    }

    pub fn used_fallback(&self) -> bool {
        self.judged_rating
            .as_ref()
            .map(|j| j.used_fallback)
            .unwrap_or(false)
    }

    pub fn failed_at(&self, stage: Stage) -> bool {
        self.failures.iter().any(|f| f.stage == stage)
    }

    /// One-line status for reports: how this candidate's score was obtained.
    pub fn status_label(&self) -> String {
        match self.final_rating() {
            FinalRating::Judged(j) if j.used_fallback => "judging fallback used".to_string(),
            FinalRating::Judged(_) => "judged".to_string(),
            FinalRating::Initial(_) => "initial rating only".to_string(),
            FinalRating::NotRated => match self.failures.first() {
                Some(f) => format!("rating not available ({} failed: {})", f.stage, f.failure),
                None => "rating not available".to_string(),
            },
        }
    }
}
