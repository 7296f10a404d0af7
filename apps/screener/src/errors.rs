use std::path::PathBuf;

use thiserror::Error;

use crate::stage::Stage;

/// Run-level failure. Per-candidate failures never surface here; they travel as
/// `StageFailure` values inside the run's records.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigError),

    #[error("No documents to screen")]
    NoDocuments,

    #[error("Run deadline expired during {stage} before any stage completed an item")]
    DeadlineExceeded { stage: Stage },

    #[error("Could not read {path}: {source}")]
    Ingest {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unsupported input {0}: expected a .pdf or .txt file, or a directory")]
    UnsupportedInput(PathBuf),
}

/// A configuration value that cannot drive a run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("{key} has invalid value {value:?}")]
    Invalid { key: String, value: String },
}
