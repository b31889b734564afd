//! Text extraction for source documents.
//!
//! PDFs go through `pdf-extract`, which concatenates every page in order.
//! Plain-text formats are read as-is. Extraction never panics; the ingestor
//! skips any file that returns an error.

use std::path::Path;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("unsupported file extension: {0}")]
    UnsupportedExtension(String),
    #[error("PDF extraction failed: {0}")]
    Pdf(String),
    #[error("read failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Lower-cased extension of `path`, without the dot.
pub fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
}

/// Extract the full text of the file at `path`.
pub fn extract_file(path: &Path) -> Result<String, ExtractError> {
    let ext = extension_of(path).unwrap_or_default();
    match ext.as_str() {
        "pdf" => {
            let bytes = std::fs::read(path)?;
            extract_pdf(&bytes)
        }
        "txt" | "md" => {
            let bytes = std::fs::read(path)?;
            Ok(String::from_utf8_lossy(&bytes).into_owned())
        }
        other => Err(ExtractError::UnsupportedExtension(other.to_string())),
    }
}

/// Extract all pages of a PDF. Malformed input that makes the parser panic
/// is reported as an error like any other parse failure.
pub fn extract_pdf(bytes: &[u8]) -> Result<String, ExtractError> {
    match std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(bytes)) {
        Ok(result) => result.map_err(|e| ExtractError::Pdf(e.to_string())),
        Err(_) => Err(ExtractError::Pdf("parser panicked on malformed input".to_string())),
    }
}
