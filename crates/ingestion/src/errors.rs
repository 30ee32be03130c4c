//! Ingestion error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestionError {
    #[error("Corpus directory not found: {0}")]
    CorpusNotFound(String),

    #[error("Chunking error: {0}")]
    ChunkingError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<IngestionError> for finrag_common::errors::AppError {
    fn from(e: IngestionError) -> Self {
        match e {
            IngestionError::IoError(io) => finrag_common::errors::AppError::Io(io),
            other => finrag_common::errors::AppError::Validation {
                message: other.to_string(),
            },
        }
    }
}
