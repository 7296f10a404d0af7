//! Document text extraction.
//!
//! `PdfTextParser` handles `.pdf` through `pdf-extract` and passes `.txt` through as UTF-8.
//! PDF decoding is CPU-bound and runs inside `tokio::task::spawn_blocking`; a panic in the
//! decoder surfaces as a decode failure for that document only.

use std::path::Path;

use async_trait::async_trait;
use tracing::debug;

use crate::models::{ParsedDocument, RawDocument};
use crate::stage::StageFailure;

#[async_trait]
pub trait DocumentParser: Send + Sync {
    async fn parse(&self, doc: &RawDocument) -> Result<ParsedDocument, StageFailure>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct PdfTextParser;

#[async_trait]
impl DocumentParser for PdfTextParser {
    async fn parse(&self, doc: &RawDocument) -> Result<ParsedDocument, StageFailure> {
        let is_text = Path::new(&doc.file_name)
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("txt"))
            .unwrap_or(false);

        let text = if is_text {
            String::from_utf8(doc.bytes.clone())
                .map_err(|e| StageFailure::Decode(format!("not valid UTF-8: {e}")))?
        } else {
            let bytes = doc.bytes.clone();
            tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
                .await
                .map_err(|e| StageFailure::Decode(format!("PDF decoder aborted: {e}")))?
                .map_err(|e| StageFailure::Decode(e.to_string()))?
        };

        let text = text.trim().to_string();
        if text.is_empty() {
            return Err(StageFailure::Decode("no extractable text".to_string()));
        }
        debug!("Parsed {}: {} chars", doc.file_name, text.chars().count());

        Ok(ParsedDocument {
            id: doc.id,
            file_name: doc.file_name.clone(),
            text,
        })
    }
}
