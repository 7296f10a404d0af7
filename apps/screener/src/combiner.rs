//! Outer join of every stage's output onto the ingested documents, then the final ranking.
//!
//! Never fails and never drops a candidate: each ingested `CandidateId` yields exactly one
//! record, whatever its stage results were.

use std::collections::HashMap;

use tracing::info;

use crate::models::{
    CandidateId, CandidateRecord, JudgedRating, ParsedDocument, Rating, RawDocument,
    StructuredProfile,
};
use crate::models::record::RecordedFailure;
use crate::stage::{Stage, StageFailure, StageResult};

/// Everything the per-candidate stages and the judge produced during one run.
#[derive(Debug, Default)]
pub struct StageOutputs {
    pub parsed: Vec<StageResult<ParsedDocument>>,
    /// Empty when cleaning was disabled.
    pub cleaned: Vec<StageResult<ParsedDocument>>,
    pub profiles: Vec<StageResult<StructuredProfile>>,
    pub ratings: Vec<StageResult<Rating>>,
    pub judged: Vec<StageResult<JudgedRating>>,
}

/// Builds one record per document and returns them ranked.
///
/// Ranking is by final score, highest first. The sort is stable over ingestion order, so
/// equal scores keep the order the documents were ingested in.
pub fn combine(documents: &[RawDocument], outputs: StageOutputs) -> Vec<CandidateRecord> {
    let mut parsed = index(outputs.parsed);
    let mut cleaned = index(outputs.cleaned);
    let mut profiles = index(outputs.profiles);
    let mut ratings = index(outputs.ratings);
    let mut judged = index(outputs.judged);

    let mut records: Vec<CandidateRecord> = documents
        .iter()
        .enumerate()
        .map(|(ingestion_index, doc)| {
            let mut failures = Vec::new();
            let _ = take(&mut parsed, doc.id, Stage::Parsing, &mut failures);
            let _ = take(&mut cleaned, doc.id, Stage::Cleaning, &mut failures);
            CandidateRecord {
                id: doc.id,
                file_name: doc.file_name.clone(),
                ingestion_index,
                profile: take(&mut profiles, doc.id, Stage::Extracting, &mut failures),
                initial_rating: take(&mut ratings, doc.id, Stage::Rating, &mut failures),
                judged_rating: take(&mut judged, doc.id, Stage::Judging, &mut failures),
                failures,
            }
        })
        .collect();

    records.sort_by(|a, b| {
        b.final_rating()
            .sort_key()
            .total_cmp(&a.final_rating().sort_key())
    });

    let rated = records
        .iter()
        .filter(|r| r.final_rating().score().is_some())
        .count();
    info!(
        "Combined {} record(s): {rated} rated, {} not rated",
        records.len(),
        records.len() - rated
    );
    records
}

/// Keys a stage's results by candidate. The first result for an id wins.
fn index<T>(results: Vec<StageResult<T>>) -> HashMap<CandidateId, StageResult<T>> {
    let mut by_id = HashMap::with_capacity(results.len());
    for result in results {
        by_id.entry(result.id()).or_insert(result);
    }
    by_id
}

/// Removes the candidate's result for `stage`. Failures other than `Upstream` are recorded;
/// an upstream skip repeats a cause already on the record.
fn take<T>(
    results: &mut HashMap<CandidateId, StageResult<T>>,
    id: CandidateId,
    stage: Stage,
    failures: &mut Vec<RecordedFailure>,
) -> Option<T> {
    match results.remove(&id)? {
        StageResult::Success { value, .. } => Some(value),
        StageResult::Failure { failure, .. } => {
            if !matches!(failure, StageFailure::Upstream(_)) {
                failures.push(RecordedFailure { stage, failure });
            }
            None
        }
    }
}
