use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{io_error, report_file_name, rows, ReportError, ReportRow, ReportSink};
use crate::models::CandidateRecord;

/// Pretty-printed JSON with every field of every record.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonReportSink;

#[derive(Serialize)]
struct JsonReport {
    generated_at: DateTime<Utc>,
    total: usize,
    candidates: Vec<ReportRow>,
}

impl ReportSink for JsonReportSink {
    fn name(&self) -> &'static str {
        "JSON"
    }

    fn write(&self, records: &[CandidateRecord], dir: &Path) -> Result<PathBuf, ReportError> {
        let report = JsonReport {
            generated_at: Utc::now(),
            total: records.len(),
            candidates: rows(records),
        };
        let body = serde_json::to_string_pretty(&report)?;

        std::fs::create_dir_all(dir).map_err(|e| io_error(dir, e))?;
        let path = dir.join(report_file_name("json"));
        std::fs::write(&path, body).map_err(|e| io_error(&path, e))?;
        Ok(path)
    }
}
