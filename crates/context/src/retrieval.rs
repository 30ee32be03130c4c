//! Retrieval orchestration
//!
//! Runs one vector search per (sub-)query and keeps the rounds aligned with
//! the sub-query order, whether they execute concurrently or in sequence.

use crate::entities::EntityResolver;
use finrag_common::config::RetrievalConfig;
use finrag_common::ScoredPassage;
use finrag_search::VectorIndex;
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Results of searching for one sub-query
#[derive(Debug, Clone)]
pub struct RetrievalRound {
    pub sub_query: String,
    /// Entity the search was scoped to, if any
    pub entity_filter: Option<String>,
    /// Descending by score
    pub results: Vec<ScoredPassage>,
}

/// Read-only driver of vector index searches
pub struct RetrievalOrchestrator {
    index: Arc<VectorIndex>,
    resolver: EntityResolver,
    config: RetrievalConfig,
}

impl RetrievalOrchestrator {
    pub fn new(index: Arc<VectorIndex>, resolver: EntityResolver, config: RetrievalConfig) -> Self {
        Self {
            index,
            resolver,
            config,
        }
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// Search once for `sub_query`.
    ///
    /// A scoped search that finds nothing is repeated unscoped. A search error
    /// is logged and yields an empty round.
    pub async fn retrieve(&self, sub_query: &str, k: usize) -> RetrievalRound {
        let mut entity_filter = if self.config.entity_scoped {
            self.resolver.single_entity(sub_query)
        } else {
            None
        };

        let mut results = self.search(sub_query, k, entity_filter.as_deref()).await;
        if results.is_empty() && entity_filter.is_some() {
            debug!(
                sub_query = %sub_query,
                entity = entity_filter.as_deref().unwrap_or("*"),
                "Scoped search empty, retrying unscoped"
            );
            entity_filter = None;
            results = self.search(sub_query, k, None).await;
        }

        info!(
            sub_query = %sub_query,
            entity = entity_filter.as_deref().unwrap_or("*"),
            results = results.len(),
            "Retrieved results"
        );

        RetrievalRound {
            sub_query: sub_query.to_string(),
            entity_filter,
            results,
        }
    }

    async fn search(&self, sub_query: &str, k: usize, entity_filter: Option<&str>) -> Vec<ScoredPassage> {
        match self.index.search(sub_query, k, entity_filter).await {
            Ok(results) => results,
            Err(e) => {
                warn!(sub_query = %sub_query, error = %e, "Retrieval failed");
                Vec::new()
            }
        }
    }

    /// One round per sub-query, in sub-query order
    pub async fn retrieve_all(&self, sub_queries: &[String], k: usize) -> Vec<RetrievalRound> {
        if self.config.parallel {
            join_all(sub_queries.iter().map(|q| self.retrieve(q, k))).await
        } else {
            let mut rounds = Vec::with_capacity(sub_queries.len());
            for q in sub_queries {
                rounds.push(self.retrieve(q, k).await);
            }
            rounds
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use finrag_common::embeddings::HashingEmbedder;
    use finrag_common::Passage;

    async fn orchestrator(config: RetrievalConfig) -> RetrievalOrchestrator {
        let index = Arc::new(VectorIndex::new(Arc::new(HashingEmbedder::new(384))));
        index
            .add(vec![
                Passage::new("MSFT", "2024", "MSFT_2024_10K", 0, "Total revenue: $245.1 billion"),
                Passage::new("NVDA", "2024", "NVDA_2024_10K", 0, "Total revenue: $60.9 billion"),
                Passage::new("GOOGL", "2023", "GOOGL_2023_10K", 0, "Advertising revenue was $237.9 billion"),
            ])
            .await
            .unwrap();
        RetrievalOrchestrator::new(index, EntityResolver::default(), config)
    }

    #[tokio::test]
    async fn test_rounds_align_with_sub_queries() {
        let orchestrator = orchestrator(RetrievalConfig::default()).await;
        let sub_queries = vec![
            "NVIDIA total revenue 2024".to_string(),
            "Microsoft total revenue 2024".to_string(),
            "Google advertising revenue 2023".to_string(),
        ];

        let rounds = orchestrator.retrieve_all(&sub_queries, 3).await;

        assert_eq!(rounds.len(), 3);
        let expected = ["NVDA", "MSFT", "GOOGL"];
        for ((round, sub_query), entity) in rounds.iter().zip(&sub_queries).zip(expected) {
            assert_eq!(&round.sub_query, sub_query);
            assert_eq!(round.entity_filter.as_deref(), Some(entity));
            assert!(!round.results.is_empty());
            assert!(round.results.iter().all(|r| r.passage.entity == entity));
        }
    }

    #[tokio::test]
    async fn test_sequential_matches_parallel() {
        let sub_queries = vec!["total revenue".to_string(), "NVIDIA revenue".to_string()];

        let parallel = orchestrator(RetrievalConfig::default()).await;
        let sequential = orchestrator(RetrievalConfig {
            parallel: false,
            ..RetrievalConfig::default()
        })
        .await;

        let a = parallel.retrieve_all(&sub_queries, 2).await;
        let b = sequential.retrieve_all(&sub_queries, 2).await;

        for (x, y) in a.iter().zip(&b) {
            let ids_x: Vec<&str> = x.results.iter().map(|r| r.passage.chunk_id.as_str()).collect();
            let ids_y: Vec<&str> = y.results.iter().map(|r| r.passage.chunk_id.as_str()).collect();
            assert_eq!(ids_x, ids_y);
        }
    }

    #[tokio::test]
    async fn test_unscoped_when_disabled_or_ambiguous() {
        let orchestrator = orchestrator(RetrievalConfig::default()).await;
        let round = orchestrator.retrieve("Microsoft versus NVIDIA revenue", 5).await;
        assert_eq!(round.entity_filter, None);
        assert_eq!(round.results.len(), 3);

        let unscoped = orchestrator_unscoped().await;
        let round = unscoped.retrieve("NVIDIA revenue", 5).await;
        assert_eq!(round.entity_filter, None);
        assert_eq!(round.results.len(), 3);
    }

    async fn orchestrator_unscoped() -> RetrievalOrchestrator {
        orchestrator(RetrievalConfig {
            entity_scoped: false,
            ..RetrievalConfig::default()
        })
        .await
    }

    #[tokio::test]
    async fn test_scoped_search_falls_back_when_outranked() {
        let index = Arc::new(VectorIndex::new(Arc::new(HashingEmbedder::new(384))));
        let msft: Vec<Passage> = (0..12)
            .map(|i| {
                Passage::new(
                    "MSFT",
                    "2024",
                    "MSFT_2024_10K",
                    i,
                    format!("What was total revenue? Total revenue was ${} billion.", 200 + i),
                )
            })
            .collect();
        index.add(msft).await.unwrap();
        index
            .add(vec![Passage::new("NVDA", "2024", "NVDA_2024_10K", 0, "Data Center segment results.")])
            .await
            .unwrap();
        let orchestrator =
            RetrievalOrchestrator::new(index.clone(), EntityResolver::default(), RetrievalConfig::default());

        let query = "What was NVIDIA's total revenue?";
        // The NVDA passage is outside the 2k over-fetched candidates
        assert!(index.search(query, 5, Some("NVDA")).await.unwrap().is_empty());

        let round = orchestrator.retrieve(query, 5).await;
        assert_eq!(round.entity_filter, None);
        assert_eq!(round.results.len(), 5);
    }

    #[tokio::test]
    async fn test_empty_index_gives_empty_rounds() {
        let index = Arc::new(VectorIndex::new(Arc::new(HashingEmbedder::new(384))));
        let orchestrator =
            RetrievalOrchestrator::new(index, EntityResolver::default(), RetrievalConfig::default());

        let rounds = orchestrator.retrieve_all(&["anything".to_string()], 3).await;
        assert_eq!(rounds.len(), 1);
        assert!(rounds[0].results.is_empty());
    }
}
