//! Report export.
//!
//! Two sinks: a rich JSON report and an ASCII-only tab-separated file. `export_with_fallback`
//! tries them in that order and never returns an error; the ranking is already computed by
//! the time a report is written, so a failed export is only a warning.

use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::models::record::RecordedFailure;
use crate::models::{CandidateId, CandidateRecord};

pub mod delimited;
pub mod json;

pub use delimited::DelimitedReportSink;
pub use json::JsonReportSink;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Could not write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not serialize report: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub trait ReportSink: Send + Sync {
    fn name(&self) -> &'static str;

    /// Writes the ranked records into `dir` and returns the file written.
    fn write(&self, records: &[CandidateRecord], dir: &Path) -> Result<PathBuf, ReportError>;
}

#[derive(Debug)]
pub enum ExportOutcome {
    Primary(PathBuf),
    /// The primary sink failed and the fallback sink wrote the report.
    Degraded { path: PathBuf, warning: String },
    /// Neither sink could write. The ranking itself is unaffected.
    Failed { warning: String },
}

impl ExportOutcome {
    pub fn path(&self) -> Option<&Path> {
        match self {
            ExportOutcome::Primary(path) | ExportOutcome::Degraded { path, .. } => Some(path),
            ExportOutcome::Failed { .. } => None,
        }
    }

    pub fn warning(&self) -> Option<&str> {
        match self {
            ExportOutcome::Primary(_) => None,
            ExportOutcome::Degraded { warning, .. } | ExportOutcome::Failed { warning } => {
                Some(warning)
            }
        }
    }
}

pub fn export_with_fallback(
    primary: &dyn ReportSink,
    fallback: &dyn ReportSink,
    records: &[CandidateRecord],
    dir: &Path,
) -> ExportOutcome {
    let primary_err = match primary.write(records, dir) {
        Ok(path) => {
            info!("{} report written to {}", primary.name(), path.display());
            return ExportOutcome::Primary(path);
        }
        Err(e) => e,
    };
    warn!("{} export failed: {primary_err}", primary.name());

    match fallback.write(records, dir) {
        Ok(path) => {
            let warning = format!(
                "{} export failed ({primary_err}); wrote {} report instead",
                primary.name(),
                fallback.name()
            );
            warn!("{warning}: {}", path.display());
            ExportOutcome::Degraded { path, warning }
        }
        Err(fallback_err) => {
            let warning = format!(
                "report not written: {} export failed ({primary_err}), {} export failed ({fallback_err})",
                primary.name(),
                fallback.name()
            );
            warn!("{warning}");
            ExportOutcome::Failed { warning }
        }
    }
}

/// Flat, serializable view of one ranked record. Shared by both sinks.
#[derive(Debug, Clone, Serialize)]
pub struct ReportRow {
    pub rank: usize,
    pub candidate_id: CandidateId,
    pub file_name: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub languages: Vec<String>,
    pub programming_languages: Vec<String>,
    pub frameworks: Vec<String>,
    pub years_experience: Option<u32>,
    pub education: Option<String>,
    pub summary: Option<String>,
    pub final_score: Option<f64>,
    pub initial_score: Option<f64>,
    pub status: String,
    pub used_fallback: bool,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub rationale: Option<String>,
    pub score_adjustment: Option<String>,
    pub failures: Vec<RecordedFailure>,
}

impl ReportRow {
    /// `rank` is 1-based.
    pub fn from_record(rank: usize, record: &CandidateRecord) -> Self {
        let profile = record.profile.clone().unwrap_or_default();
        let shown = record
            .judged_rating
            .as_ref()
            .map(|j| &j.rating)
            .or(record.initial_rating.as_ref());
        let adjustment = record
            .judged_rating
            .as_ref()
            .map(|j| j.adjustment_rationale.clone())
            .filter(|a| !a.is_empty());

        Self {
            rank,
            candidate_id: record.id,
            file_name: record.file_name.clone(),
            name: profile.name,
            email: profile.email,
            phone: profile.phone,
            languages: profile.languages.unwrap_or_default(),
            programming_languages: profile.programming_languages.unwrap_or_default(),
            frameworks: profile.frameworks.unwrap_or_default(),
            years_experience: profile.years_experience,
            education: profile.education,
            summary: profile.summary,
            final_score: record.final_rating().score(),
            initial_score: record.initial_rating.as_ref().map(|r| r.score),
            status: record.status_label(),
            used_fallback: record.used_fallback(),
            strengths: shown.map(|r| r.strengths.clone()).unwrap_or_default(),
            weaknesses: shown.map(|r| r.weaknesses.clone()).unwrap_or_default(),
            rationale: shown.map(|r| r.rationale.clone()).filter(|r| !r.is_empty()),
            score_adjustment: adjustment,
            failures: record.failures.clone(),
        }
    }
}

pub fn rows(records: &[CandidateRecord]) -> Vec<ReportRow> {
    records
        .iter()
        .enumerate()
        .map(|(i, record)| ReportRow::from_record(i + 1, record))
        .collect()
}

/// `screening_report_<UTC timestamp>.<extension>`
pub(crate) fn report_file_name(extension: &str) -> String {
    format!(
        "screening_report_{}.{extension}",
        chrono::Utc::now().format("%Y%m%d_%H%M%S")
    )
}

pub(crate) fn io_error(path: &Path, source: std::io::Error) -> ReportError {
    ReportError::Io {
        path: path.to_path_buf(),
        source,
    }
}
