//! Filing text corpus
//!
//! Supplies `(entity, period, raw_text)` documents from a directory laid out
//! as `{data_dir}/{ENTITY}/{PERIOD}.txt`. Acquisition (download, HTML
//! extraction) happens upstream; this module only reads plain UTF-8 text.

use crate::chunker::Chunker;
use crate::errors::IngestionError;
use finrag_common::Passage;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};

/// Raw text for one entity and period
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDocument {
    pub entity: String,
    pub period: String,
    /// e.g. `NVDA_2024_10K`
    pub source: String,
    pub text: String,
}

impl SourceDocument {
    pub fn new(entity: impl Into<String>, period: impl Into<String>, text: impl Into<String>) -> Self {
        let entity = entity.into();
        let period = period.into();
        let source = format!("{}_{}_10K", entity, period);
        Self {
            entity,
            period,
            source,
            text: text.into(),
        }
    }

    /// Chunk this document into passages
    pub fn chunk(&self, chunker: &Chunker) -> Vec<Passage> {
        chunker.chunk(&self.text, &self.entity, &self.period, &self.source)
    }
}

/// Load every `{ENTITY}/{PERIOD}.txt` document under `dir`.
///
/// Documents are returned sorted by entity then period. Empty or unreadable
/// files are skipped with a warning; a missing root directory is an error.
#[instrument(skip(dir), fields(corpus = %dir.display()))]
pub async fn load_corpus(dir: &Path) -> Result<Vec<SourceDocument>, IngestionError> {
    if !tokio::fs::try_exists(dir).await.unwrap_or(false) {
        return Err(IngestionError::CorpusNotFound(dir.display().to_string()));
    }

    let mut documents = Vec::new();

    for entity_dir in sorted_entries(dir).await? {
        if !entity_dir.is_dir() {
            continue;
        }
        let Some(entity) = file_name(&entity_dir) else {
            continue;
        };

        for file in sorted_entries(&entity_dir).await? {
            if file.extension().and_then(|e| e.to_str()) != Some("txt") {
                continue;
            }
            let Some(period) = file.file_stem().and_then(|s| s.to_str()).map(str::to_string) else {
                continue;
            };

            match tokio::fs::read_to_string(&file).await {
                Ok(text) if text.trim().is_empty() => {
                    warn!(entity = %entity, period = %period, "Skipping empty filing text");
                }
                Ok(text) => documents.push(SourceDocument::new(entity.clone(), period, text)),
                Err(e) => {
                    warn!(path = %file.display(), error = %e, "Skipping unreadable filing text");
                }
            }
        }
    }

    info!(documents = documents.len(), "Corpus loaded");
    Ok(documents)
}

async fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>, IngestionError> {
    let mut entries = Vec::new();
    let mut reader = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = reader.next_entry().await? {
        entries.push(entry.path());
    }
    entries.sort();
    Ok(entries)
}

fn file_name(path: &Path) -> Option<String> {
    path.file_name().and_then(|n| n.to_str()).map(str::to_string)
}
