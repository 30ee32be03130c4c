//! FinRAG Common Library
//!
//! Shared code for all FinRAG crates including:
//! - Passage, citation and query result models
//! - Embedding client abstraction
//! - Language-model client abstraction
//! - Error types and handling
//! - Configuration management
//! - Metrics and observability

pub mod config;
pub mod embeddings;
pub mod errors;
pub mod llm;
pub mod metrics;
pub mod models;
pub mod retry;

// Re-export commonly used types
pub use config::AppConfig;
pub use embeddings::Embedder;
pub use errors::{AppError, Result};
pub use llm::LanguageModel;
pub use models::{Citation, Passage, QueryResult, ScoredPassage};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default embedding model (offline feature hashing)
pub const DEFAULT_EMBEDDING_MODEL: &str = "feature-hashing-v1";

/// Default embedding dimension
pub const DEFAULT_EMBEDDING_DIMENSION: usize = 384;

/// Default chat model served by the OpenAI-compatible endpoint
pub const DEFAULT_CHAT_MODEL: &str = "llama-3.1-8b-instant";
