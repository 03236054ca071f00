//! docqa Configuration Management
//!
//! Handles configuration from environment variables with sensible defaults
//! for development. The pipeline consumes these values; it never reads the
//! environment itself.

use serde::{Deserialize, Serialize};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// Server configuration
    pub server: ServerConfig,

    /// Vector index connection
    pub vector: VectorConfig,

    /// LLM provider configuration (completions and embeddings)
    pub llm: LlmConfig,

    /// Answering pipeline configuration
    pub pipeline: PipelineConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        // Server
        if let Ok(host) = std::env::var("API_HOST") {
            config.server.host = host;
        }
        if let Ok(port) = std::env::var("API_PORT") {
            config.server.port = port.parse().map_err(|_| ConfigError::InvalidValue {
                key: "API_PORT".to_string(),
                value: port,
            })?;
        }

        // Qdrant
        if let Ok(url) = std::env::var("QDRANT_URL") {
            config.vector.qdrant_url = url;
        }
        if let Ok(collection) = std::env::var("QDRANT_COLLECTION") {
            config.vector.collection = collection;
        }

        // LLM
        if let Ok(provider) = std::env::var("LLM_PROVIDER") {
            config.llm.provider = provider.parse()?;
        }
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            config.llm.openai_api_key = Some(key);
        }
        if let Ok(url) = std::env::var("OLLAMA_URL") {
            config.llm.ollama_url = url;
        }
        if let Ok(model) = std::env::var("LLM_MODEL") {
            config.llm.model = model;
        }
        if let Ok(model) = std::env::var("EMBEDDING_MODEL") {
            config.llm.embedding_model = model;
        }

        // Pipeline
        if let Ok(v) = std::env::var("CHUNK_SIZE") {
            config.pipeline.chunk_size = parse_env("CHUNK_SIZE", v)?;
        }
        if let Ok(v) = std::env::var("CHUNK_OVERLAP") {
            config.pipeline.chunk_overlap = parse_env("CHUNK_OVERLAP", v)?;
        }
        if let Ok(v) = std::env::var("TOP_K") {
            config.pipeline.top_k = parse_env("TOP_K", v)?;
        }
        if let Ok(v) = std::env::var("MIN_SCORE") {
            config.pipeline.min_score = parse_env("MIN_SCORE", v)?;
        }
        if let Ok(v) = std::env::var("MAX_CONCURRENCY") {
            config.pipeline.max_concurrency = parse_env("MAX_CONCURRENCY", v)?;
        }
        if let Ok(v) = std::env::var("REQUEST_DEADLINE_SECS") {
            config.pipeline.request_deadline_secs = parse_env("REQUEST_DEADLINE_SECS", v)?;
        }
        if let Ok(v) = std::env::var("CACHE_TTL_SECS") {
            config.pipeline.cache_ttl_secs = parse_env("CACHE_TTL_SECS", v)?;
        }

        // Logging
        if let Ok(level) = std::env::var("LOG_LEVEL") {
            config.logging.level = level;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate cross-field constraints
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pipeline.chunk_overlap >= self.pipeline.chunk_size {
            return Err(ConfigError::InvalidValue {
                key: "CHUNK_OVERLAP".to_string(),
                value: format!(
                    "{} (must be smaller than CHUNK_SIZE {})",
                    self.pipeline.chunk_overlap, self.pipeline.chunk_size
                ),
            });
        }
        if self.pipeline.max_concurrency == 0 {
            return Err(ConfigError::InvalidValue {
                key: "MAX_CONCURRENCY".to_string(),
                value: "0".to_string(),
            });
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: String) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value,
    })
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Request timeout in seconds
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            request_timeout_secs: 300,
        }
    }
}

/// Vector index connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorConfig {
    /// Qdrant gRPC URL
    pub qdrant_url: String,

    /// Qdrant collection name
    pub collection: String,

    /// Vector dimension (must match embedding model)
    pub vector_dimension: usize,
}

impl Default for VectorConfig {
    fn default() -> Self {
        Self {
            qdrant_url: "http://localhost:6334".to_string(),
            collection: "docqa_chunks".to_string(),
            vector_dimension: 1536, // OpenAI text-embedding-3-small
        }
    }
}

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Provider to use for completions and embeddings
    pub provider: LlmProvider,

    /// OpenAI API key
    pub openai_api_key: Option<String>,

    /// OpenAI API base URL (for Azure or compatible APIs)
    pub openai_base_url: Option<String>,

    /// Ollama server URL
    pub ollama_url: String,

    /// Completion model name
    pub model: String,

    /// Embedding model name
    pub embedding_model: String,

    /// Maximum tokens for completion
    pub max_tokens: u32,

    /// Temperature for generation
    pub temperature: f32,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::OpenAi,
            openai_api_key: None,
            openai_base_url: None,
            ollama_url: "http://localhost:11434".to_string(),
            model: "gpt-4o-mini".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            max_tokens: 1024,
            temperature: 0.1,
            timeout_secs: 60,
        }
    }
}

/// Supported LLM providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    OpenAi,
    Ollama,
}

impl std::str::FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "ollama" => Ok(Self::Ollama),
            _ => Err(ConfigError::InvalidValue {
                key: "LLM_PROVIDER".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// Answering pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Target chunk size in characters
    pub chunk_size: usize,

    /// Overlap between adjacent chunks in characters
    pub chunk_overlap: usize,

    /// Maximum chunks returned per retrieval
    pub top_k: usize,

    /// Minimum similarity score for a retrieved chunk to be used
    ///
    /// Chunks below the threshold are discarded with no fallback: an empty
    /// result set is preferred over weakly grounded passages.
    pub min_score: f32,

    /// Maximum concurrent question-processing tasks per request
    pub max_concurrency: usize,

    /// Wall-clock budget for one request in seconds
    pub request_deadline_secs: u64,

    /// Time-to-live for cached answers in seconds
    pub cache_ttl_secs: u64,

    /// Maximum number of cached answers
    pub cache_capacity: u64,

    /// Retry attempts for ingestion-path service calls
    pub ingest_retry_attempts: u32,

    /// Base delay for ingestion retry backoff in milliseconds
    pub ingest_retry_base_ms: u64,

    /// Maximum characters of passage context included in one prompt
    pub max_context_chars: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 50,
            top_k: 8,
            min_score: 0.35,
            max_concurrency: 5,
            request_deadline_secs: 300,
            cache_ttl_secs: 600,
            cache_capacity: 1_000,
            ingest_retry_attempts: 3,
            ingest_retry_base_ms: 250,
            max_context_chars: 8000,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// JSON format for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.vector.vector_dimension, 1536);
        assert_eq!(config.pipeline.chunk_size, 500);
        assert_eq!(config.pipeline.chunk_overlap, 50);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_llm_provider_parse() {
        assert_eq!("openai".parse::<LlmProvider>().unwrap(), LlmProvider::OpenAi);
        assert_eq!("Ollama".parse::<LlmProvider>().unwrap(), LlmProvider::Ollama);
        assert!("bedrock".parse::<LlmProvider>().is_err());
    }

    #[test]
    fn test_overlap_must_be_smaller_than_chunk() {
        let mut config = AppConfig::default();
        config.pipeline.chunk_overlap = config.pipeline.chunk_size;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let mut config = AppConfig::default();
        config.pipeline.max_concurrency = 0;
        assert!(config.validate().is_err());
    }
}
