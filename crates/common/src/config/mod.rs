//! Configuration management for FinRAG
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config/default, config/{APP_ENV}, config/local)
//! - Default values
//!
//! `GROQ_API_KEY` and `OPENAI_API_KEY` are honoured when no key is configured.

use crate::errors::{AppError, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    /// Passage chunking
    #[serde(default)]
    pub chunking: ChunkingConfig,

    /// Embedding provider
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Language-model endpoint
    #[serde(default)]
    pub llm: LlmConfig,

    /// Query decomposition
    #[serde(default)]
    pub planner: PlannerConfig,

    /// Retrieval rounds
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Answer synthesis
    #[serde(default)]
    pub synthesis: SynthesisConfig,

    /// Filing text corpus
    #[serde(default)]
    pub corpus: CorpusConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChunkingConfig {
    /// Maximum words per chunk before a split is forced
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Trailing words of a closed chunk carried into the next one
    #[serde(default = "default_chunk_overlap")]
    pub overlap: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmbeddingConfig {
    /// Embedding provider: hashing, openai
    #[serde(default = "default_embedding_provider")]
    pub provider: String,

    /// API key for embedding service
    pub api_key: Option<String>,

    /// API base URL (for custom endpoints)
    pub api_base: Option<String>,

    /// Model to use
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Embedding dimension
    #[serde(default = "default_embedding_dimension")]
    pub dimension: usize,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub timeout_secs: u64,

    /// Maximum retries
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Batch size for embedding requests
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LlmConfig {
    /// OpenAI-compatible API base URL
    #[serde(default = "default_llm_api_base")]
    pub api_base: String,

    /// API key
    pub api_key: Option<String>,

    /// Chat model name
    #[serde(default = "default_llm_model")]
    pub model: String,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub timeout_secs: u64,

    /// Maximum retries on transient failures
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlannerConfig {
    /// Cap applied to line-parsed sub-queries
    #[serde(default = "default_max_sub_queries")]
    pub max_sub_queries: usize,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_decomposition_tokens")]
    pub max_tokens: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetrievalConfig {
    /// Results per sub-query when decomposed
    #[serde(default = "default_decomposed_k")]
    pub decomposed_k: usize,

    /// Results for a direct single query
    #[serde(default = "default_direct_k")]
    pub direct_k: usize,

    /// Restrict a search to the one entity its query mentions
    #[serde(default = "default_enabled")]
    pub entity_scoped: bool,

    /// Run the retrieval rounds of one query concurrently
    #[serde(default = "default_enabled")]
    pub parallel: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SynthesisConfig {
    /// Character budget of the assembled context
    #[serde(default = "default_context_budget")]
    pub context_budget_chars: usize,

    /// Excerpt length per passage in decomposed mode
    #[serde(default = "default_multi_excerpt")]
    pub multi_excerpt_chars: usize,

    /// Excerpt length per passage in direct mode
    #[serde(default = "default_direct_excerpt")]
    pub direct_excerpt_chars: usize,

    /// Excerpt length of a citation
    #[serde(default = "default_citation_excerpt")]
    pub citation_excerpt_chars: usize,

    #[serde(default = "default_max_citations_decomposed")]
    pub max_citations_decomposed: usize,

    #[serde(default = "default_max_citations_direct")]
    pub max_citations_direct: usize,

    #[serde(default = "default_multi_tokens")]
    pub multi_max_tokens: usize,

    #[serde(default = "default_direct_tokens")]
    pub direct_max_tokens: usize,

    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CorpusConfig {
    /// Directory laid out as `{ENTITY}/{PERIOD}.txt`
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub json_logging: bool,

    /// Prometheus exporter port (0 to disable)
    #[serde(default)]
    pub metrics_port: u16,
}

// Default value functions
fn default_chunk_size() -> usize { 800 }
fn default_chunk_overlap() -> usize { 100 }
fn default_embedding_provider() -> String { "hashing".to_string() }
fn default_embedding_model() -> String { crate::DEFAULT_EMBEDDING_MODEL.to_string() }
fn default_embedding_dimension() -> usize { crate::DEFAULT_EMBEDDING_DIMENSION }
fn default_request_timeout() -> u64 { 30 }
fn default_max_retries() -> u32 { 3 }
fn default_batch_size() -> usize { 64 }
fn default_llm_api_base() -> String { "https://api.groq.com/openai/v1".to_string() }
fn default_llm_model() -> String { crate::DEFAULT_CHAT_MODEL.to_string() }
fn default_max_sub_queries() -> usize { 6 }
fn default_temperature() -> f32 { 0.1 }
fn default_decomposition_tokens() -> usize { 200 }
fn default_decomposed_k() -> usize { 3 }
fn default_direct_k() -> usize { 5 }
fn default_enabled() -> bool { true }
fn default_context_budget() -> usize { 4000 }
fn default_multi_excerpt() -> usize { 500 }
fn default_direct_excerpt() -> usize { 300 }
fn default_citation_excerpt() -> usize { 200 }
fn default_max_citations_decomposed() -> usize { 10 }
fn default_max_citations_direct() -> usize { 5 }
fn default_multi_tokens() -> usize { 500 }
fn default_direct_tokens() -> usize { 300 }
fn default_data_dir() -> PathBuf { PathBuf::from("sec_data") }
fn default_log_level() -> String { "info".to_string() }

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            overlap: default_chunk_overlap(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            api_key: None,
            api_base: None,
            model: default_embedding_model(),
            dimension: default_embedding_dimension(),
            timeout_secs: default_request_timeout(),
            max_retries: default_max_retries(),
            batch_size: default_batch_size(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_base: default_llm_api_base(),
            api_key: None,
            model: default_llm_model(),
            timeout_secs: default_request_timeout(),
            max_retries: default_max_retries(),
        }
    }
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            max_sub_queries: default_max_sub_queries(),
            temperature: default_temperature(),
            max_tokens: default_decomposition_tokens(),
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            decomposed_k: default_decomposed_k(),
            direct_k: default_direct_k(),
            entity_scoped: default_enabled(),
            parallel: default_enabled(),
        }
    }
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            context_budget_chars: default_context_budget(),
            multi_excerpt_chars: default_multi_excerpt(),
            direct_excerpt_chars: default_direct_excerpt(),
            citation_excerpt_chars: default_citation_excerpt(),
            max_citations_decomposed: default_max_citations_decomposed(),
            max_citations_direct: default_max_citations_direct(),
            multi_max_tokens: default_multi_tokens(),
            direct_max_tokens: default_direct_tokens(),
            temperature: default_temperature(),
        }
    }
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: false,
            metrics_port: 0,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Load base config file
            .add_source(File::with_name("config/default").required(false))
            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            // Load local overrides
            .add_source(File::with_name("config/local").required(false))
            // e.g., APP__RETRIEVAL__DIRECT_K=8
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Self::finish(config.try_deserialize()?)
    }

    /// Load from a specific configuration file
    pub fn from_file(path: &str) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Self::finish(config.try_deserialize()?)
    }

    fn finish(mut config: AppConfig) -> Result<Self> {
        config.apply_key_fallbacks(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    /// Fill missing API keys from the conventional provider variables
    fn apply_key_fallbacks<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if self.llm.api_key.is_none() {
            self.llm.api_key = lookup("GROQ_API_KEY").or_else(|| lookup("OPENAI_API_KEY"));
        }
        if self.embedding.api_key.is_none() {
            self.embedding.api_key = lookup("OPENAI_API_KEY");
        }
    }

    /// Reject settings that would make retrieval meaningless
    pub fn validate(&self) -> Result<()> {
        let checks = [
            (self.chunking.chunk_size == 0, "chunking.chunk_size must be positive"),
            (self.embedding.dimension == 0, "embedding.dimension must be positive"),
            (self.embedding.batch_size == 0, "embedding.batch_size must be positive"),
            (self.retrieval.decomposed_k == 0, "retrieval.decomposed_k must be positive"),
            (self.retrieval.direct_k == 0, "retrieval.direct_k must be positive"),
            (self.planner.max_sub_queries == 0, "planner.max_sub_queries must be positive"),
            (
                self.synthesis.context_budget_chars == 0,
                "synthesis.context_budget_chars must be positive",
            ),
        ];

        match checks.iter().find(|(failed, _)| *failed) {
            Some((_, message)) => Err(AppError::Configuration {
                message: message.to_string(),
            }),
            None => Ok(()),
        }
    }
}
