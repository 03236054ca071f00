//! docqa Parser - Document text extraction and chunking
//!
//! Turns a document reference into clean extracted text and splits that text
//! into an ordered sequence of overlapping chunks, the atomic unit of
//! embedding and retrieval.
//!
//! Chunk sizes and offsets are counted in characters (Unicode scalar
//! values), never raw bytes, so multibyte text can never be split
//! mid-character.

use thiserror::Error;

pub mod fetch;
pub mod pdf;

pub use fetch::HttpDocumentSource;
pub use pdf::extract_pdf_text;

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur while resolving a document into text
#[derive(Error, Debug)]
pub enum ParserError {
    /// Document could not be downloaded
    #[error("Download failed: {0}")]
    Download(String),

    /// PDF extraction error
    #[error("PDF parsing error: {0}")]
    Pdf(String),

    /// Extraction produced no text
    #[error("Document contains no extractable text")]
    EmptyDocument,

    /// IO error while reading a local file
    #[error("IO error reading file: {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, ParserError>;

impl From<ParserError> for docqa_core::QaError {
    fn from(err: ParserError) -> Self {
        match err {
            ParserError::Download(msg) => docqa_core::QaError::DocumentFetch(msg),
            other => docqa_core::QaError::Parse(other.to_string()),
        }
    }
}

// ============================================================================
// Chunking
// ============================================================================

/// A contiguous slice of document text
///
/// Offsets are character positions into the cleaned document text. Chunks
/// cover the document in order and adjacent chunks overlap by a fixed
/// amount so context spanning a boundary is not lost.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    /// Sequence index within the document (retrieval tie-break order)
    pub index: u32,

    /// Starting character offset
    pub start: usize,

    /// Ending character offset (exclusive)
    pub end: usize,

    /// Text content
    pub content: String,
}

/// How far back from the target cut a boundary break is searched
const CUT_LOOKBACK: usize = 100;

/// Split text into overlapping chunks of approximately `target_size` characters
///
/// Prefers to cut at a paragraph or sentence boundary within a bounded
/// look-back window; falls back to a hard cut at `target_size`. Each chunk
/// after the first starts `overlap` characters before the previous cut.
///
/// Empty text yields an empty sequence; text no longer than `target_size`
/// yields exactly one chunk. Output is deterministic for identical input.
pub fn chunk(text: &str, target_size: usize, overlap: usize) -> Vec<TextChunk> {
    if text.is_empty() {
        return Vec::new();
    }
    let target = target_size.max(1);
    let overlap = overlap.min(target - 1);

    // Byte offset of every character boundary; position i is the i-th char.
    let mut boundaries: Vec<usize> = text.char_indices().map(|(b, _)| b).collect();
    boundaries.push(text.len());
    let total_chars = boundaries.len() - 1;

    let mut chunks = Vec::new();
    let mut start = 0usize;
    let mut index = 0u32;

    loop {
        let hard_end = (start + target).min(total_chars);
        let end = if hard_end < total_chars {
            find_cut(text, &boundaries, start, hard_end)
        } else {
            total_chars
        };

        chunks.push(TextChunk {
            index,
            start,
            end,
            content: text[boundaries[start]..boundaries[end]].to_string(),
        });

        if end >= total_chars {
            break;
        }

        let next = end.saturating_sub(overlap);
        // A short boundary cut combined with a large overlap must not stall.
        start = if next > start { next } else { end };
        index += 1;
    }

    chunks
}

/// Find a break point at or before the target cut position
///
/// Returns a character position in `(start, target]`.
fn find_cut(text: &str, boundaries: &[usize], start: usize, target: usize) -> usize {
    let lookback = CUT_LOOKBACK.min(target - start - 1);
    let window_start = target - lookback;
    let window = &text[boundaries[window_start]..boundaries[target]];

    // Paragraph break first
    if let Some(pos) = window.rfind("\n\n") {
        return char_pos(boundaries, boundaries[window_start] + pos + 2);
    }

    // Then a sentence end
    for pattern in [". ", "。", "! ", "? "] {
        if let Some(pos) = window.rfind(pattern) {
            return char_pos(boundaries, boundaries[window_start] + pos + pattern.len());
        }
    }

    // Then a line break
    if let Some(pos) = window.rfind('\n') {
        return char_pos(boundaries, boundaries[window_start] + pos + 1);
    }

    target
}

/// Map a byte offset back to its character position
fn char_pos(boundaries: &[usize], byte_offset: usize) -> usize {
    boundaries.partition_point(|&b| b < byte_offset)
}

// ============================================================================
// Text Cleanup
// ============================================================================

/// Normalize text extracted from a PDF
///
/// Collapses whitespace runs, repairs lowercase-uppercase seams left by
/// column-joined extraction, and restores paragraph breaks after sentence
/// punctuation so the chunker sees usable boundaries.
pub fn clean_extracted_text(text: &str) -> String {
    // Pass 1: collapse whitespace runs to a single space and repair seams.
    let mut flat = String::with_capacity(text.len());
    let mut pending_space = false;
    let mut prev: Option<char> = None;

    for ch in text.chars() {
        if ch.is_whitespace() {
            pending_space = !flat.is_empty();
            continue;
        }
        if pending_space {
            flat.push(' ');
            pending_space = false;
        } else if let Some(p) = prev {
            if p.is_lowercase() && ch.is_uppercase() {
                flat.push(' ');
            }
        }
        flat.push(ch);
        prev = Some(ch);
    }

    // Pass 2: a sentence end followed by an uppercase letter starts a new
    // paragraph.
    let mut out = String::with_capacity(flat.len());
    let mut chars = flat.chars().peekable();
    while let Some(ch) = chars.next() {
        out.push(ch);
        if matches!(ch, '.' | '!' | '?') && chars.peek() == Some(&' ') {
            let mut ahead = chars.clone();
            ahead.next();
            if ahead.peek().is_some_and(|c| c.is_uppercase()) {
                chars.next();
                out.push_str("\n\n");
            }
        }
    }

    out
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_empty_text() {
        assert!(chunk("", 500, 50).is_empty());
    }

    #[test]
    fn test_chunk_short_text_single_chunk() {
        let chunks = chunk("short document", 500, 50);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].index, 0);
        assert_eq!(chunks[0].start, 0);
        assert_eq!(chunks[0].end, 14);
        assert_eq!(chunks[0].content, "short document");
    }

    #[test]
    fn test_chunk_offsets_without_break_opportunities() {
        // 1200 uniform characters: no boundary breaks, hard cuts only.
        let text = "x".repeat(1200);
        let chunks = chunk(&text, 500, 50);

        assert_eq!(chunks.len(), 3);
        assert_eq!((chunks[0].start, chunks[0].end), (0, 500));
        assert_eq!((chunks[1].start, chunks[1].end), (450, 950));
        assert_eq!((chunks[2].start, chunks[2].end), (900, 1200));
        assert_eq!(
            chunks.iter().map(|c| c.index).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
    }

    #[test]
    fn test_chunk_prefers_paragraph_break() {
        let mut text = "a".repeat(460);
        text.push_str("\n\n");
        text.push_str(&"b".repeat(538));

        let chunks = chunk(&text, 500, 50);
        // First cut lands on the paragraph break at 462, inside the look-back
        // window of the target cut at 500.
        assert_eq!(chunks[0].end, 462);
        assert!(chunks[0].content.ends_with("\n\n"));
        assert_eq!(chunks[1].start, 412);
    }

    #[test]
    fn test_chunk_prefers_sentence_break() {
        let mut text = "a".repeat(478);
        text.push_str(". ");
        text.push_str(&"b".repeat(520));

        let chunks = chunk(&text, 500, 50);
        assert_eq!(chunks[0].end, 480);
        assert!(chunks[0].content.ends_with(". "));
    }

    #[test]
    fn test_chunk_deterministic() {
        let text = "The quick brown fox jumps over the lazy dog. ".repeat(40);
        let a = chunk(&text, 500, 50);
        let b = chunk(&text, 500, 50);
        assert_eq!(a, b);
    }

    #[test]
    fn test_chunk_multibyte_does_not_panic() {
        let text = "日本語のテキストです。".repeat(120);
        let chunks = chunk(&text, 100, 10);
        assert!(!chunks.is_empty());

        let total_chars = text.chars().count();
        assert_eq!(chunks.last().unwrap().end, total_chars);
        for c in &chunks {
            assert_eq!(c.content.chars().count(), c.end - c.start);
        }
    }

    #[test]
    fn test_chunks_cover_document_in_order() {
        let text = "z".repeat(1234);
        let chunks = chunk(&text, 300, 40);

        assert_eq!(chunks[0].start, 0);
        assert_eq!(chunks.last().unwrap().end, 1234);
        for window in chunks.windows(2) {
            // Next chunk starts before the previous ends: overlap, no gaps.
            assert!(window[1].start < window[0].end);
            assert!(window[1].end > window[0].end);
        }
    }

    #[test]
    fn test_clean_collapses_whitespace() {
        let cleaned = clean_extracted_text("some   text\t with\n\n  gaps");
        assert_eq!(cleaned, "some text with gaps");
    }

    #[test]
    fn test_clean_repairs_joined_words() {
        let cleaned = clean_extracted_text("premiumAmount");
        assert_eq!(cleaned, "premium Amount");
    }

    #[test]
    fn test_clean_restores_paragraph_breaks() {
        let cleaned = clean_extracted_text("First sentence. Second sentence.");
        assert_eq!(cleaned, "First sentence.\n\nSecond sentence.");
    }

    #[test]
    fn test_clean_keeps_abbreviation_like_endings() {
        // Lowercase continuation after a period is not a paragraph break.
        let cleaned = clean_extracted_text("approx. value of 3");
        assert_eq!(cleaned, "approx. value of 3");
    }
}
