//! Query planner
//!
//! Decides whether a question is answered directly or split into
//! independently retrievable sub-queries by the language model.
//! Decomposition never fails: any model or parsing problem degrades to the
//! original question as the only sub-query.

use finrag_common::config::PlannerConfig;
use finrag_common::{metrics, LanguageModel};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Comparison and aggregation cues, matched as lower-cased substrings
pub const DECOMPOSITION_CUES: &[&str] = &[
    "compare",
    "comparison",
    "versus",
    "vs",
    "which",
    "highest",
    "lowest",
    "growth",
    "change",
    "difference",
    "all three",
    "across companies",
    "between",
    "how much",
    "percentage",
];

/// True when `query` contains any decomposition cue
pub fn needs_decomposition(query: &str) -> bool {
    let lower = query.to_lowercase();
    DECOMPOSITION_CUES.iter().any(|cue| lower.contains(cue))
}

/// Execution plan for one top-level question
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryPlan {
    /// Retrieve once for the question itself
    Direct(String),
    /// Retrieve once per sub-query, in order
    Decomposed(Vec<String>),
}

/// Planner backed by a language model for decomposition
pub struct QueryPlanner {
    llm: Arc<dyn LanguageModel>,
    config: PlannerConfig,
}

impl QueryPlanner {
    pub fn new(llm: Arc<dyn LanguageModel>, config: PlannerConfig) -> Self {
        Self { llm, config }
    }

    /// Classify `query` and decompose it when needed
    pub async fn plan(&self, query: &str) -> QueryPlan {
        if needs_decomposition(query) {
            info!("Query needs decomposition");
            QueryPlan::Decomposed(self.decompose(query).await)
        } else {
            debug!("Simple query, direct retrieval");
            QueryPlan::Direct(query.to_string())
        }
    }

    /// Ask the model for sub-queries; falls back to `[query]` on any failure
    #[instrument(skip(self))]
    pub async fn decompose(&self, query: &str) -> Vec<String> {
        let prompt = decomposition_prompt(query);

        let response = match self
            .llm
            .complete(&prompt, self.config.temperature, self.config.max_tokens)
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Query decomposition failed, using original query");
                metrics::record_decomposition_fallback("model_error");
                return vec![query.to_string()];
            }
        };

        let sub_queries = parse_sub_queries(&response, self.config.max_sub_queries);
        if sub_queries.is_empty() {
            warn!("Decomposition returned no sub-queries, using original query");
            metrics::record_decomposition_fallback("empty_response");
            return vec![query.to_string()];
        }

        info!(count = sub_queries.len(), sub_queries = ?sub_queries, "Query decomposed");
        sub_queries
    }
}

fn decomposition_prompt(query: &str) -> String {
    format!(
        "Break down this financial query into specific sub-queries that can be answered independently.\n\
         Each sub-query should be for a specific company and metric.\n\n\
         Query: {}\n\n\
         Return only a JSON list of sub-queries, nothing else.\n\
         Example format: [\"Microsoft total revenue 2023\", \"Google total revenue 2023\"]",
        query
    )
}

/// Parse a decomposition response.
///
/// A JSON list of strings is used as-is. Anything else is read line by line:
/// blank lines and `#` comments are dropped, surrounding quotes stripped, and
/// the result capped at `max_lines`.
pub fn parse_sub_queries(response: &str, max_lines: usize) -> Vec<String> {
    let content = strip_code_fence(response.trim());

    if content.starts_with('[') && content.ends_with(']') {
        if let Ok(list) = serde_json::from_str::<Vec<String>>(content) {
            return list
                .into_iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
    }

    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| line.trim_matches('"').trim_matches('\'').trim().to_string())
        .filter(|line| !line.is_empty())
        .take(max_lines)
        .collect()
}

/// Remove a surrounding ``` fence (with optional language tag)
fn strip_code_fence(content: &str) -> &str {
    let Some(rest) = content.strip_prefix("```") else {
        return content;
    };
    let body = rest.split_once('\n').map(|(_, body)| body).unwrap_or("");
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}
