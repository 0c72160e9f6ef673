//! PDF adapter: text layer of every page, in page order. No OCR.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;

use crate::ParseError;

/// Extract the text layer of a PDF file.
///
/// Scanned documents without a text layer yield an empty string.
pub fn extract(path: &Path) -> Result<String, ParseError> {
    let bytes = std::fs::read(path)?;
    extract_from_mem(&bytes)
}

/// Extract from an in-memory PDF. The parser state lives only for this call.
pub fn extract_from_mem(bytes: &[u8]) -> Result<String, ParseError> {
    if bytes.is_empty() {
        return Err(ParseError::Pdf("empty file".into()));
    }

    // pdf-extract panics on some malformed fonts and streams
    let pages = catch_unwind(AssertUnwindSafe(|| {
        pdf_extract::extract_text_from_mem_by_pages(bytes)
    }))
    .map_err(|_| ParseError::Pdf("parser panicked".into()))?
    .map_err(|e| ParseError::Pdf(e.to_string()))?;

    Ok(pages.concat())
}
