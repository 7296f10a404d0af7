// Document ingestion: turns a file or a directory into `RawDocument`s.
// Each document gets its CandidateId here, once. Text extraction lives in parser.rs.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::errors::PipelineError;
use crate::models::RawDocument;

pub mod parser;

pub use parser::{DocumentParser, PdfTextParser};

const SUPPORTED_EXTENSIONS: [&str; 2] = ["pdf", "txt"];

pub fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|s| s.eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false)
}

/// Reads a single `.pdf`/`.txt` file, or every supported file of a directory.
///
/// Directory entries are sorted by file name so ingestion order, and with it the ranking
/// tie-break, is reproducible. Unsupported entries and subdirectories are skipped.
pub async fn load_documents(path: &Path) -> Result<Vec<RawDocument>, PipelineError> {
    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|source| ingest_error(path, source))?;

    let files = if metadata.is_dir() {
        list_directory(path).await?
    } else if is_supported(path) {
        vec![path.to_path_buf()]
    } else {
        return Err(PipelineError::UnsupportedInput(path.to_path_buf()));
    };

    let mut documents = Vec::with_capacity(files.len());
    for file in files {
        let bytes = tokio::fs::read(&file)
            .await
            .map_err(|source| ingest_error(&file, source))?;
        let file_name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| file.display().to_string());
        let doc = RawDocument::new(file_name, bytes);
        debug!("Ingested {} as {}", doc.file_name, doc.id);
        documents.push(doc);
    }

    info!("Ingested {} document(s) from {}", documents.len(), path.display());
    Ok(documents)
}

async fn list_directory(dir: &Path) -> Result<Vec<PathBuf>, PipelineError> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|source| ingest_error(dir, source))?;

    let mut files = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|source| ingest_error(dir, source))?
    {
        let path = entry.path();
        let is_file = entry
            .file_type()
            .await
            .map(|t| t.is_file())
            .unwrap_or(false);
        if is_file && is_supported(&path) {
            files.push(path);
        } else {
            debug!("Skipping {}", path.display());
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

fn ingest_error(path: &Path, source: std::io::Error) -> PipelineError {
    PipelineError::Ingest {
        path: path.to_path_buf(),
        source,
    }
}
