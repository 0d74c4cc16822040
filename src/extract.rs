//! PDF text extraction.
//!
//! Wraps the `pdf-extract` crate behind a small error type. Extraction is
//! whole-document: the library returns one plain-text string per file, and
//! source attribution is carried as chunk metadata downstream.

/// Extraction error. An unreadable PDF aborts the enclosing operation
/// (startup load or upload) rather than being silently skipped.
#[derive(Debug)]
pub enum ExtractError {
    Pdf(String),
}

impl std::fmt::Display for ExtractError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractError::Pdf(e) => write!(f, "PDF extraction failed: {}", e),
        }
    }
}

impl std::error::Error for ExtractError {}

/// Extract plain UTF-8 text from PDF bytes.
pub fn extract_pdf_text(bytes: &[u8]) -> Result<String, ExtractError> {
    pdf_extract::extract_text_from_mem(bytes).map_err(|e| ExtractError::Pdf(e.to_string()))
}
