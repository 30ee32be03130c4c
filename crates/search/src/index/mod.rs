//! Vector index over filing passages
//!
//! Append-only: passages are embedded in batches and appended to a flat
//! inner-product structure. The index owns every passage; search results
//! share them read-only through `Arc`.
//!
//! Mutation is guarded by a single-writer/multi-reader lock. Embedding runs
//! outside the lock so searches are not blocked by a slow embedding call.

mod flat;

pub use flat::{l2_normalize, FlatIndex};

use finrag_common::errors::{AppError, Result};
use finrag_common::{metrics, Embedder, Passage, ScoredPassage};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

/// Snapshot of index contents
#[derive(Debug, Clone, Default, Serialize)]
pub struct IndexStats {
    pub passages: usize,
    pub dimension: usize,
    /// Passage count per entity
    pub entities: BTreeMap<String, usize>,
}

#[derive(Default)]
struct IndexState {
    /// Row `i` of `structure` belongs to `passages[i]`
    passages: Vec<Arc<Passage>>,
    ids: HashSet<String>,
    /// `None` until the first successful `add`
    structure: Option<FlatIndex>,
}

/// Semantic vector index with entity-filtered top-k search
pub struct VectorIndex {
    embedder: Arc<dyn Embedder>,
    state: RwLock<IndexState>,
}

impl VectorIndex {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            state: RwLock::new(IndexState::default()),
        }
    }

    /// Embed and append a batch of passages, returning how many were added.
    ///
    /// An empty batch is a no-op. The batch is rejected as a whole if any
    /// passage has empty content or a chunk id already present in the index
    /// (or repeated within the batch).
    #[instrument(skip(self, passages), fields(batch = passages.len()))]
    pub async fn add(&self, passages: Vec<Passage>) -> Result<usize> {
        if passages.is_empty() {
            warn!("No passages to add");
            return Ok(0);
        }

        {
            let state = self.state.read().await;
            validate_batch(&state.ids, &passages)?;
        }

        let texts: Vec<String> = passages.iter().map(|p| p.content.clone()).collect();
        let vectors = self.embedder.embed_batch(&texts).await?;
        if vectors.len() != passages.len() {
            return Err(AppError::EmbeddingError {
                message: format!(
                    "Expected {} embeddings, got {}",
                    passages.len(),
                    vectors.len()
                ),
            });
        }

        let mut state = self.state.write().await;
        // A concurrent add may have landed while embedding
        validate_batch(&state.ids, &passages)?;

        let dimension = match &state.structure {
            Some(structure) => structure.dimension(),
            None => vectors.first().map(Vec::len).unwrap_or(0),
        };
        if dimension == 0 {
            return Err(AppError::EmbeddingError {
                message: "Embedder returned zero-dimension vectors".to_string(),
            });
        }

        let structure = state
            .structure
            .get_or_insert_with(|| FlatIndex::new(dimension));
        structure.add(&vectors)?;

        let added = passages.len();
        for passage in passages {
            state.ids.insert(passage.chunk_id.clone());
            state.passages.push(Arc::new(passage));
        }

        metrics::record_indexing(added);
        info!(added = added, total = state.passages.len(), "Passages indexed");

        Ok(added)
    }

    /// Top-`k` passages most similar to `query`.
    ///
    /// Fetches `min(2k, total)` neighbours, then drops those whose entity does
    /// not match `entity_filter`. Fewer than `k` results (possibly none) come
    /// back when the over-fetched candidates run out; the search is not widened.
    /// An index that has never been added to returns no results.
    #[instrument(skip(self, query, entity_filter), fields(entity = entity_filter.unwrap_or("*")))]
    pub async fn search(
        &self,
        query: &str,
        k: usize,
        entity_filter: Option<&str>,
    ) -> Result<Vec<ScoredPassage>> {
        let start = Instant::now();
        let outcome = self.search_inner(query, k, entity_filter).await;

        metrics::record_retrieval(
            start.elapsed().as_secs_f64(),
            entity_filter.is_some(),
            outcome.is_ok(),
        );
        outcome
    }

    async fn search_inner(
        &self,
        query: &str,
        k: usize,
        entity_filter: Option<&str>,
    ) -> Result<Vec<ScoredPassage>> {
        if k == 0 || self.is_empty().await {
            return Ok(Vec::new());
        }

        let query_vector = self.embedder.embed(query).await?;

        let state = self.state.read().await;
        let Some(structure) = &state.structure else {
            return Ok(Vec::new());
        };

        let fetch = k.saturating_mul(2).min(state.passages.len());
        let candidates = structure.search(&query_vector, fetch)?;

        let results: Vec<ScoredPassage> = candidates
            .into_iter()
            .filter_map(|(row, score)| {
                let passage = state.passages.get(row)?;
                match entity_filter {
                    Some(entity) if passage.entity != entity => None,
                    _ => Some(ScoredPassage::new(Arc::clone(passage), score)),
                }
            })
            .take(k)
            .collect();

        debug!(
            candidates = fetch,
            returned = results.len(),
            "Vector search complete"
        );

        Ok(results)
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.passages.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn stats(&self) -> IndexStats {
        let state = self.state.read().await;
        let mut entities = BTreeMap::new();
        for passage in &state.passages {
            *entities.entry(passage.entity.clone()).or_insert(0) += 1;
        }

        IndexStats {
            passages: state.passages.len(),
            dimension: state.structure.as_ref().map(FlatIndex::dimension).unwrap_or(0),
            entities,
        }
    }
}

fn validate_batch(existing: &HashSet<String>, passages: &[Passage]) -> Result<()> {
    let mut seen = HashSet::with_capacity(passages.len());
    for passage in passages {
        if passage.content.trim().is_empty() {
            return Err(AppError::Validation {
                message: format!("Passage {} has empty content", passage.chunk_id),
            });
        }
        if existing.contains(&passage.chunk_id) || !seen.insert(passage.chunk_id.as_str()) {
            return Err(AppError::DuplicateChunk {
                chunk_id: passage.chunk_id.clone(),
            });
        }
    }
    Ok(())
}
