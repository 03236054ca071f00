//! PDF text extraction using pdf-extract
//!
//! Operates on in-memory bytes; the fetch layer decides where bytes come
//! from.

use crate::{ParserError, Result};

/// Extract text from PDF bytes
///
/// An extraction that yields only whitespace is treated as a failure: there
/// is nothing to chunk or retrieve from.
pub fn extract_pdf_text(bytes: &[u8]) -> Result<String> {
    let text = pdf_extract::extract_text_from_mem(bytes)
        .map_err(|e| ParserError::Pdf(e.to_string()))?;

    if text.trim().is_empty() {
        return Err(ParserError::EmptyDocument);
    }

    Ok(text)
}

/// Whether the bytes look like a PDF file
pub fn is_pdf(bytes: &[u8]) -> bool {
    bytes.starts_with(b"%PDF")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_pdf_magic() {
        assert!(is_pdf(b"%PDF-1.7 rest of file"));
        assert!(!is_pdf(b"plain text"));
        assert!(!is_pdf(b""));
    }

    #[test]
    fn test_garbage_bytes_fail() {
        assert!(extract_pdf_text(b"definitely not a pdf").is_err());
    }
}
