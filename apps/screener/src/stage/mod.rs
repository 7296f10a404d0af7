//! Stage vocabulary shared by the runner, the judge, the combiner and the orchestrator.
//!
//! `StageResult<T>` is the only type that crosses a stage boundary. A per-item failure is
//! a value carried alongside its `CandidateId`, never an error that aborts the batch.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::llm_client::InferenceError;
use crate::models::{CandidateId, ParsedDocument, RawDocument};

pub mod progress;
pub mod runner;

pub use progress::{ProgressEvent, ProgressKind, ProgressReporter};
pub use runner::StageRunner;

/// A homogeneous transformation applied to every candidate of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Ingesting,
    Parsing,
    Cleaning,
    Extracting,
    Rating,
    Judging,
    Combining,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Ingesting => "ingesting",
            Stage::Parsing => "parsing",
            Stage::Cleaning => "cleaning",
            Stage::Extracting => "extracting",
            Stage::Rating => "rating",
            Stage::Judging => "judging",
            Stage::Combining => "combining",
        };
        f.write_str(name)
    }
}

/// Why a stage produced no value for one candidate.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
pub enum StageFailure {
    #[error("inference failed: {0}")]
    Inference(#[from] InferenceError),

    #[error("could not decode document: {0}")]
    Decode(String),

    /// A predecessor stage already failed for this candidate.
    #[error("skipped, {0} failed earlier")]
    Upstream(Stage),

    /// The run deadline expired before this item was dispatched.
    #[error("run deadline expired before processing")]
    Timeout,
}

/// Outcome of one stage for one candidate.
#[derive(Debug, Clone, PartialEq)]
pub enum StageResult<T> {
    Success { id: CandidateId, value: T },
    Failure { id: CandidateId, failure: StageFailure },
}

impl<T> StageResult<T> {
    pub fn success(id: CandidateId, value: T) -> Self {
        StageResult::Success { id, value }
    }

    pub fn failure(id: CandidateId, failure: StageFailure) -> Self {
        StageResult::Failure { id, failure }
    }

    pub fn from_result(id: CandidateId, result: Result<T, StageFailure>) -> Self {
        match result {
            Ok(value) => Self::success(id, value),
            Err(failure) => Self::failure(id, failure),
        }
    }

    pub fn id(&self) -> CandidateId {
        match self {
            StageResult::Success { id, .. } | StageResult::Failure { id, .. } => *id,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, StageResult::Success { .. })
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            StageResult::Success { value, .. } => Some(value),
            StageResult::Failure { .. } => None,
        }
    }

    pub fn failure_reason(&self) -> Option<&StageFailure> {
        match self {
            StageResult::Success { .. } => None,
            StageResult::Failure { failure, .. } => Some(failure),
        }
    }

    /// Borrowed view used to feed the next stage.
    ///
    /// A failed predecessor becomes `Upstream(stage)` so the next stage can skip the
    /// item without an inference call.
    pub fn as_input(&self, stage: Stage) -> Result<&T, StageFailure> {
        match self {
            StageResult::Success { value, .. } => Ok(value),
            StageResult::Failure { .. } => Err(StageFailure::Upstream(stage)),
        }
    }
}

/// Anything carrying the candidate identity a stage result must be keyed by.
pub trait Keyed {
    fn candidate_id(&self) -> CandidateId;
}

impl Keyed for RawDocument {
    fn candidate_id(&self) -> CandidateId {
        self.id
    }
}

impl Keyed for ParsedDocument {
    fn candidate_id(&self) -> CandidateId {
        self.id
    }
}

impl<T> Keyed for StageResult<T> {
    fn candidate_id(&self) -> CandidateId {
        self.id()
    }
}
