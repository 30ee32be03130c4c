//! FinRAG Ingestion
//!
//! Turns raw filing text into passages ready for indexing:
//! - Corpus loading (`{ENTITY}/{PERIOD}.txt`)
//! - Sentence-aware chunking with word overlap

pub mod chunker;
pub mod corpus;
pub mod errors;

pub use chunker::Chunker;
pub use corpus::{load_corpus, SourceDocument};
pub use errors::IngestionError;
