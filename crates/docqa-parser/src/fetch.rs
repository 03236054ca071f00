//! Document fetching
//!
//! Resolves a document reference (HTTP(S) URL or local path) into clean
//! extracted text. Implements the `DocumentSource` contract consumed by the
//! pipeline coordinator.

use std::time::Duration;

use async_trait::async_trait;
use docqa_core::{DocumentSource, QaError};

use crate::pdf::{extract_pdf_text, is_pdf};
use crate::{clean_extracted_text, ParserError};

/// Default timeout for document downloads
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(30);

/// Fetches PDF documents over HTTP or from the local filesystem
pub struct HttpDocumentSource {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpDocumentSource {
    /// Create a source with the default download timeout
    pub fn new() -> Self {
        Self::with_timeout(DOWNLOAD_TIMEOUT)
    }

    /// Create a source with a custom download timeout
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            timeout,
        }
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, ParserError> {
        let response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| ParserError::Download(format!("{url}: {e}")))?;

        if !response.status().is_success() {
            return Err(ParserError::Download(format!(
                "{url}: status {}",
                response.status()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ParserError::Download(format!("{url}: {e}")))?;

        Ok(bytes.to_vec())
    }

    fn read_local(&self, path: &str) -> Result<Vec<u8>, ParserError> {
        std::fs::read(path).map_err(|e| ParserError::Io {
            path: path.to_string(),
            source: e,
        })
    }
}

impl Default for HttpDocumentSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentSource for HttpDocumentSource {
    async fn fetch_text(&self, reference: &str) -> docqa_core::Result<String> {
        tracing::debug!(reference, "fetching document");

        let bytes = if reference.starts_with("http://") || reference.starts_with("https://") {
            self.download(reference).await?
        } else {
            self.read_local(reference)?
        };

        let raw = if is_pdf(&bytes) {
            extract_pdf_text(&bytes)?
        } else {
            // Plain-text fallback for non-PDF references
            String::from_utf8(bytes)
                .map_err(|_| QaError::Parse("document is neither PDF nor UTF-8 text".to_string()))?
        };

        let text = clean_extracted_text(&raw);
        if text.is_empty() {
            return Err(ParserError::EmptyDocument.into());
        }

        tracing::info!(reference, chars = text.chars().count(), "document fetched");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_local_file_is_parse_error() {
        let source = HttpDocumentSource::new();
        let err = source.fetch_text("/nonexistent/file.pdf").await.unwrap_err();
        assert!(matches!(err, QaError::Parse(_)));
    }

    #[tokio::test]
    async fn test_unreachable_url_is_fetch_error() {
        let source = HttpDocumentSource::with_timeout(Duration::from_millis(200));
        let err = source
            .fetch_text("http://127.0.0.1:1/none.pdf")
            .await
            .unwrap_err();
        assert!(matches!(err, QaError::DocumentFetch(_)));
    }
}
