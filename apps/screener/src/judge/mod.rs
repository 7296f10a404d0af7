//! Consistency judge: a second pass that re-scores the rated pool relative to itself.
//!
//! The pool is cut into contiguous batches of at most `batch_size` candidates, in input
//! order. Each batch is one `JudgingService` call; batches run through the stage runner
//! under the same concurrency bound as the per-candidate stages.
//!
//! The judge never fails a candidate. Whatever goes wrong with a batch, every candidate
//! in it still leaves with a `JudgedRating`, falling back to its initial rating.

use std::collections::HashMap;
use std::ops::Range;
use std::sync::Arc;

use tracing::{info, warn};

use crate::models::rating::clamp_score;
use crate::models::{CandidateId, JudgedRating, Rating};
use crate::stage::{Stage, StageResult, StageRunner};

pub mod prompts;
pub mod service;

pub use service::{JudgeCandidate, JudgedEntry, JudgingService, LlmJudge};

pub const DEFAULT_BATCH_SIZE: usize = 5;

/// Splits `0..len` into `ceil(len / batch_size)` contiguous ranges. Only the last may be short.
pub fn partition(len: usize, batch_size: usize) -> Vec<Range<usize>> {
    let batch_size = batch_size.max(1);
    (0..len)
        .step_by(batch_size)
        .map(|start| start..(start + batch_size).min(len))
        .collect()
}

pub struct ConsistencyJudge {
    service: Arc<dyn JudgingService>,
    batch_size: usize,
}

impl ConsistencyJudge {
    pub fn new(service: Arc<dyn JudgingService>, batch_size: usize) -> Self {
        Self {
            service,
            batch_size: batch_size.max(1),
        }
    }

    /// Judges every candidate. Output is one success per input, in input order.
    pub async fn judge(
        &self,
        runner: &StageRunner,
        candidates: &[JudgeCandidate],
        job_description: &str,
    ) -> Vec<StageResult<JudgedRating>> {
        let batches = partition(candidates.len(), self.batch_size);
        info!(
            "Judging {} candidate(s) in {} batch(es) of up to {}",
            candidates.len(),
            batches.len(),
            self.batch_size
        );

        let service = &self.service;
        let responses = runner
            .run_units(Stage::Judging, &batches, move |range| async move {
                service
                    .judge_batch(&candidates[range.clone()], job_description)
                    .await
            })
            .await;

        let mut judged = Vec::with_capacity(candidates.len());
        for (batch_no, (range, response)) in batches.iter().zip(responses).enumerate() {
            let batch = &candidates[range.clone()];
            let ratings = match response {
                None => {
                    warn!("Judge batch {} not dispatched before the run deadline", batch_no + 1);
                    fallback_all(batch, "batch not judged before the run deadline")
                }
                Some(Err(e)) => {
                    warn!("Judge batch {} failed: {e}", batch_no + 1);
                    fallback_all(batch, &e.to_string())
                }
                Some(Ok(entries)) => reconcile(batch_no + 1, batch, entries),
            };
            judged.extend(
                batch
                    .iter()
                    .zip(ratings)
                    .map(|(c, rating)| StageResult::success(c.id, rating)),
            );
        }
        judged
    }
}

fn fallback_reason(detail: &str) -> String {
    format!("No adjustment: original rating kept due to a processing error ({detail})")
}

fn fallback_all(batch: &[JudgeCandidate], detail: &str) -> Vec<JudgedRating> {
    let reason = fallback_reason(detail);
    batch
        .iter()
        .map(|c| JudgedRating::fallback(&c.rating, reason.clone()))
        .collect()
}

/// Maps a batch response back onto the batch, one `JudgedRating` per candidate.
///
/// Any entry naming a candidate outside the batch discards the whole response.
/// Otherwise the first entry per candidate wins, and candidates without a usable
/// entry fall back individually.
fn reconcile(
    batch_no: usize,
    batch: &[JudgeCandidate],
    entries: Vec<JudgedEntry>,
) -> Vec<JudgedRating> {
    if let Some(stray) = entries
        .iter()
        .find(|e| !batch.iter().any(|c| c.id == e.candidate_id))
    {
        warn!(
            "Judge batch {batch_no} named candidate {} outside the batch; keeping initial ratings",
            stray.candidate_id
        );
        return fallback_all(batch, "judge response named an unknown candidate");
    }

    let mut by_id: HashMap<CandidateId, JudgedEntry> = HashMap::with_capacity(entries.len());
    for entry in entries {
        by_id.entry(entry.candidate_id).or_insert(entry);
    }

    let mut missing = 0;
    let ratings = batch
        .iter()
        .map(|c| {
            match by_id
                .remove(&c.id)
                .and_then(|entry| judged_rating(&c.rating, entry))
            {
                Some(judged) => judged,
                None => {
                    missing += 1;
                    JudgedRating::fallback(&c.rating, fallback_reason("missing judge rating"))
                }
            }
        })
        .collect();

    if missing > 0 {
        warn!(
            "Judge batch {batch_no}: {missing}/{} candidate(s) missing from the response",
            batch.len()
        );
    }
    ratings
}

/// `None` when the entry has no finite score.
fn judged_rating(initial: &Rating, entry: JudgedEntry) -> Option<JudgedRating> {
    let score = clamp_score(entry.score?)?;
    Some(JudgedRating {
        rating: Rating {
            score,
            strengths: entry.strengths.unwrap_or_else(|| initial.strengths.clone()),
            weaknesses: entry.weaknesses.unwrap_or_else(|| initial.weaknesses.clone()),
            rationale: entry.rationale.unwrap_or_else(|| initial.rationale.clone()),
        },
        initial_score: initial.score,
        adjustment_rationale: entry.adjustment.unwrap_or_default(),
        used_fallback: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::InferenceError;
    use crate::models::StructuredProfile;
    use crate::stage::ProgressReporter;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::time::Instant;

    type Responder =
        dyn Fn(&[JudgeCandidate]) -> Result<Vec<JudgedEntry>, InferenceError> + Send + Sync;

    struct FakeJudge {
        respond: Box<Responder>,
        delay: Duration,
        seen: Mutex<Vec<Vec<CandidateId>>>,
    }

    impl FakeJudge {
        fn new(
            respond: impl Fn(&[JudgeCandidate]) -> Result<Vec<JudgedEntry>, InferenceError>
                + Send
                + Sync
                + 'static,
        ) -> Self {
            Self {
                respond: Box::new(respond),
                delay: Duration::ZERO,
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl JudgingService for FakeJudge {
        async fn judge_batch(
            &self,
            batch: &[JudgeCandidate],
            _job_description: &str,
        ) -> Result<Vec<JudgedEntry>, InferenceError> {
            self.seen
                .lock()
                .unwrap()
                .push(batch.iter().map(|c| c.id).collect());
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            (self.respond)(batch)
        }
    }

    fn pool(scores: &[f64]) -> Vec<JudgeCandidate> {
        scores
            .iter()
            .map(|&score| JudgeCandidate {
                id: CandidateId::new(),
                profile: StructuredProfile::default(),
                rating: Rating {
                    score,
                    strengths: vec!["initial strength".into()],
                    weaknesses: vec![],
                    rationale: "initial rationale".into(),
                },
            })
            .collect()
    }

    fn runner(concurrency: usize) -> StageRunner {
        StageRunner::new(concurrency, None, ProgressReporter::disabled())
    }

    fn scores(results: &[StageResult<JudgedRating>]) -> Vec<f64> {
        results.iter().map(|r| r.value().unwrap().score()).collect()
    }

    #[test]
    fn test_partition_is_contiguous() {
        assert_eq!(partition(12, 5), vec![0..5, 5..10, 10..12]);
        assert_eq!(partition(10, 5), vec![0..5, 5..10]);
        assert_eq!(partition(3, 5), vec![0..3]);
        assert!(partition(0, 5).is_empty());
        assert_eq!(partition(2, 0), vec![0..1, 1..2]);
    }

    #[tokio::test]
    async fn test_batches_follow_input_order() {
        let candidates = pool(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]);
        let fake = Arc::new(FakeJudge::new(|batch| {
            Ok(batch
                .iter()
                .map(|c| JudgedEntry::scored(c.id, c.rating.score + 1.0))
                .collect())
        }));
        let judge = ConsistencyJudge::new(fake.clone(), 3);

        let results = judge.judge(&runner(1), &candidates, "jd").await;

        let seen = fake.seen.lock().unwrap().clone();
        let expected: Vec<Vec<CandidateId>> = candidates
            .chunks(3)
            .map(|chunk| chunk.iter().map(|c| c.id).collect())
            .collect();
        assert_eq!(seen, expected);
        assert_eq!(scores(&results), vec![2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);
        for (candidate, result) in candidates.iter().zip(&results) {
            assert_eq!(result.id(), candidate.id);
        }
    }

    #[tokio::test]
    async fn test_malformed_batch_falls_back_for_everyone() {
        let candidates = pool(&[4.0, 6.0, 8.0]);
        let fake = Arc::new(FakeJudge::new(|_| {
            Err(InferenceError::MalformedResponse("not json".into()))
        }));
        let judge = ConsistencyJudge::new(fake, 5);

        let results = judge.judge(&runner(2), &candidates, "jd").await;

        assert_eq!(scores(&results), vec![4.0, 6.0, 8.0]);
        for result in &results {
            let judged = result.value().unwrap();
            assert!(judged.used_fallback);
            assert!(judged.adjustment_rationale.contains("processing error"));
            assert_eq!(judged.rating.rationale, "initial rationale");
        }
    }

    #[tokio::test]
    async fn test_partial_response_falls_back_only_for_missing() {
        let candidates = pool(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        let fake = Arc::new(FakeJudge::new(|batch| {
            Ok(batch
                .iter()
                .take(3)
                .map(|c| JudgedEntry::scored(c.id, 9.0))
                .collect())
        }));
        let judge = ConsistencyJudge::new(fake, 5);

        let results = judge.judge(&runner(2), &candidates, "jd").await;
        let flags: Vec<bool> = results
            .iter()
            .map(|r| r.value().unwrap().used_fallback)
            .collect();

        assert_eq!(flags, vec![false, false, false, true, true]);
        assert_eq!(scores(&results), vec![9.0, 9.0, 9.0, 4.0, 5.0]);
    }

    #[tokio::test]
    async fn test_out_of_range_score_is_clamped_without_fallback() {
        let candidates = pool(&[7.0]);
        let fake = Arc::new(FakeJudge::new(|batch| {
            Ok(vec![JudgedEntry::scored(batch[0].id, 12.5)])
        }));
        let judge = ConsistencyJudge::new(fake, 5);

        let results = judge.judge(&runner(1), &candidates, "jd").await;
        let judged = results[0].value().unwrap();

        assert_eq!(judged.score(), 10.0);
        assert_eq!(judged.initial_score, 7.0);
        assert!(!judged.used_fallback);
        assert_eq!(judged.rating.strengths, vec!["initial strength".to_string()]);
        assert_eq!(judged.rating.rationale, "initial rationale");
    }

    #[tokio::test]
    async fn test_foreign_candidate_discards_whole_batch() {
        let candidates = pool(&[3.0, 5.0]);
        let fake = Arc::new(FakeJudge::new(|batch| {
            Ok(vec![
                JudgedEntry::scored(batch[0].id, 9.0),
                JudgedEntry::scored(CandidateId::new(), 9.0),
            ])
        }));
        let judge = ConsistencyJudge::new(fake, 5);

        let results = judge.judge(&runner(1), &candidates, "jd").await;

        assert_eq!(scores(&results), vec![3.0, 5.0]);
        assert!(results.iter().all(|r| r.value().unwrap().used_fallback));
    }

    #[tokio::test]
    async fn test_duplicate_entries_first_wins_and_nan_counts_as_missing() {
        let candidates = pool(&[3.0, 5.0]);
        let fake = Arc::new(FakeJudge::new(|batch| {
            Ok(vec![
                JudgedEntry::scored(batch[0].id, 6.0),
                JudgedEntry::scored(batch[0].id, 1.0),
                JudgedEntry::scored(batch[1].id, f64::NAN),
            ])
        }));
        let judge = ConsistencyJudge::new(fake, 5);

        let results = judge.judge(&runner(1), &candidates, "jd").await;

        assert_eq!(scores(&results), vec![6.0, 5.0]);
        assert!(!results[0].value().unwrap().used_fallback);
        assert!(results[1].value().unwrap().used_fallback);
    }

    #[tokio::test(start_paused = true)]
    async fn test_undispatched_batches_fall_back_after_deadline() {
        let candidates = pool(&[1.0, 2.0, 3.0, 4.0]);
        let mut fake = FakeJudge::new(|batch| {
            Ok(batch.iter().map(|c| JudgedEntry::scored(c.id, 9.0)).collect())
        });
        fake.delay = Duration::from_millis(100);
        let judge = ConsistencyJudge::new(Arc::new(fake), 2);
        let runner = StageRunner::new(
            1,
            Some(Instant::now() + Duration::from_millis(50)),
            ProgressReporter::disabled(),
        );

        let results = judge.judge(&runner, &candidates, "jd").await;

        assert_eq!(results.len(), 4);
        assert_eq!(scores(&results), vec![9.0, 9.0, 3.0, 4.0]);
        assert!(results[2].value().unwrap().used_fallback);
        assert!(results[3].value().unwrap().used_fallback);
    }
}
