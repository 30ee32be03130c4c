//! Query agent
//!
//! Drives one top-level question through
//! `PLAN → DIRECT | DECOMPOSED → RETRIEVE (×N) → SYNTHESIZE → DONE`.
//! There is no error state: every failure downgrades to a well-formed
//! [`QueryResult`] carrying an explanatory answer.

use crate::planner::{QueryPlan, QueryPlanner};
use crate::retrieval::{RetrievalOrchestrator, RetrievalRound};
use crate::synthesizer::AnswerSynthesizer;
use finrag_common::models::QueryMode;
use finrag_common::{metrics, QueryResult};
use std::time::Instant;
use tracing::{info, instrument};

/// Everything produced while answering one question
#[derive(Debug, Clone)]
pub struct QueryOutcome {
    pub mode: QueryMode,
    /// One round per executed (sub-)query, in order
    pub rounds: Vec<RetrievalRound>,
    pub result: QueryResult,
}

pub struct QueryAgent {
    planner: QueryPlanner,
    orchestrator: RetrievalOrchestrator,
    synthesizer: AnswerSynthesizer,
}

impl QueryAgent {
    pub fn new(
        planner: QueryPlanner,
        orchestrator: RetrievalOrchestrator,
        synthesizer: AnswerSynthesizer,
    ) -> Self {
        Self {
            planner,
            orchestrator,
            synthesizer,
        }
    }

    /// Answer `query`
    pub async fn process_query(&self, query: &str) -> QueryResult {
        self.run(query).await.result
    }

    /// Answer `query`, keeping the plan mode and retrieval rounds
    #[instrument(skip(self))]
    pub async fn run(&self, query: &str) -> QueryOutcome {
        let start = Instant::now();
        let retrieval = self.orchestrator.config();

        let outcome = match self.planner.plan(query).await {
            QueryPlan::Direct(question) => {
                let round = self.orchestrator.retrieve(&question, retrieval.direct_k).await;
                let result = self.synthesizer.synthesize_direct(query, &round).await;
                QueryOutcome {
                    mode: QueryMode::Direct,
                    rounds: vec![round],
                    result,
                }
            }
            QueryPlan::Decomposed(sub_queries) => {
                info!(sub_queries = ?sub_queries, "Executing sub-queries");
                let rounds = self
                    .orchestrator
                    .retrieve_all(&sub_queries, retrieval.decomposed_k)
                    .await;
                let result = self
                    .synthesizer
                    .synthesize_decomposed(query, sub_queries, &rounds)
                    .await;
                QueryOutcome {
                    mode: QueryMode::Decomposed,
                    rounds,
                    result,
                }
            }
        };

        metrics::record_query(
            start.elapsed().as_secs_f64(),
            outcome.mode.as_str(),
            outcome.result.sources.len(),
        );
        info!(
            mode = outcome.mode.as_str(),
            rounds = outcome.rounds.len(),
            sources = outcome.result.sources.len(),
            "Query processed"
        );

        outcome
    }
}
