//! Context engine
//!
//! Owns the whole pipeline: chunker, vector index and query agent. The
//! embedding and language-model clients are constructed once here and
//! shared with the components that need them.

use crate::agent::{QueryAgent, QueryOutcome};
use crate::entities::EntityResolver;
use crate::planner::QueryPlanner;
use crate::retrieval::RetrievalOrchestrator;
use crate::synthesizer::AnswerSynthesizer;
use finrag_common::embeddings::create_embedder;
use finrag_common::errors::Result;
use finrag_common::llm::ChatCompletionsClient;
use finrag_common::{AppConfig, Embedder, LanguageModel, QueryResult};
use finrag_ingestion::{load_corpus, Chunker, SourceDocument};
use finrag_search::VectorIndex;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Canonical demonstration questions
pub const SAMPLE_QUERIES: &[&str] = &[
    "What was NVIDIA's total revenue in fiscal year 2024?",
    "What percentage of Google's 2023 revenue came from advertising?",
    "How much did Microsoft's cloud revenue grow from 2022 to 2023?",
    "Which of the three companies had the highest gross margin in 2023?",
    "Compare the R&D spending as a percentage of revenue across all three companies in 2023",
];

pub struct ContextEngine {
    chunker: Chunker,
    index: Arc<VectorIndex>,
    agent: QueryAgent,
}

impl ContextEngine {
    /// Build the engine with the configured embedding and chat clients
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let embedder = create_embedder(&config.embedding)?;
        let llm: Arc<dyn LanguageModel> = Arc::new(ChatCompletionsClient::new(&config.llm)?);
        Self::with_components(config, embedder, llm)
    }

    /// Build the engine around caller-supplied clients
    pub fn with_components(
        config: &AppConfig,
        embedder: Arc<dyn Embedder>,
        llm: Arc<dyn LanguageModel>,
    ) -> Result<Self> {
        let chunker = Chunker::new(config.chunking.clone())?;
        let index = Arc::new(VectorIndex::new(embedder));

        let agent = QueryAgent::new(
            QueryPlanner::new(Arc::clone(&llm), config.planner.clone()),
            RetrievalOrchestrator::new(
                Arc::clone(&index),
                EntityResolver::default(),
                config.retrieval.clone(),
            ),
            AnswerSynthesizer::new(llm, config.synthesis.clone()),
        );

        Ok(Self {
            chunker,
            index,
            agent,
        })
    }

    pub fn index(&self) -> &Arc<VectorIndex> {
        &self.index
    }

    /// Chunk and index documents, one index batch per document
    #[instrument(skip(self, documents), fields(documents = documents.len()))]
    pub async fn ingest(&self, documents: &[SourceDocument]) -> Result<usize> {
        let mut total = 0;
        for doc in documents {
            if doc.text.trim().is_empty() {
                warn!(entity = %doc.entity, period = %doc.period, "Skipping empty document");
                continue;
            }

            let chunks = doc.chunk(&self.chunker);
            info!(
                entity = %doc.entity,
                period = %doc.period,
                chunks = chunks.len(),
                "Created chunks"
            );
            total += self.index.add(chunks).await?;
        }

        info!(passages = total, "Index built");
        Ok(total)
    }

    /// Load the corpus under `dir` and index it
    pub async fn setup_from_corpus(&self, dir: &Path) -> Result<usize> {
        let documents = load_corpus(dir).await?;
        self.ingest(&documents).await
    }

    pub async fn query(&self, question: &str) -> QueryResult {
        self.agent.process_query(question).await
    }

    /// Answer `question`, keeping the retrieval rounds
    pub async fn query_traced(&self, question: &str) -> QueryOutcome {
        self.agent.run(question).await
    }

    /// Answer questions one after another
    pub async fn run_queries<S: AsRef<str>>(&self, questions: &[S]) -> Vec<QueryResult> {
        let mut results = Vec::with_capacity(questions.len());
        for question in questions {
            results.push(self.query(question.as_ref()).await);
        }
        results
    }
}

/// Write results as a pretty-printed JSON list
pub async fn persist_results(path: &Path, results: &[QueryResult]) -> Result<()> {
    let json = serde_json::to_string_pretty(results)?;
    tokio::fs::write(path, json).await?;
    info!(path = %path.display(), results = results.len(), "Results saved");
    Ok(())
}
