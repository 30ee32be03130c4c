//! Answer synthesis
//!
//! Assembles retrieved passages into a bounded, provenance-tagged context,
//! asks the language model for a grounded answer and attaches citations.
//! A failed model call never escapes: the answer becomes an error message and
//! the collected sources are still returned.

use crate::retrieval::RetrievalRound;
use finrag_common::config::SynthesisConfig;
use finrag_common::models::{truncate_chars, QueryMode};
use finrag_common::{metrics, Citation, LanguageModel, QueryResult, ScoredPassage};
use std::sync::Arc;
use tracing::{info, instrument, warn};

pub const NO_INFORMATION_ANSWER: &str = "No relevant information found in the vector store.";
pub const NO_INFORMATION_REASONING: &str = "No matching documents found";
pub const DIRECT_REASONING: &str = "Direct retrieval from vector store with single-step reasoning";
pub const SYNTHESIS_ERROR_REASONING: &str = "Error in synthesis step";

/// Language-model answer generator over retrieval rounds
pub struct AnswerSynthesizer {
    llm: Arc<dyn LanguageModel>,
    config: SynthesisConfig,
}

impl AnswerSynthesizer {
    pub fn new(llm: Arc<dyn LanguageModel>, config: SynthesisConfig) -> Self {
        Self { llm, config }
    }

    /// Context for a decomposed query: a header per sub-query followed by its
    /// tagged excerpts, cut to the character budget
    pub fn build_context(&self, rounds: &[RetrievalRound]) -> String {
        let mut parts: Vec<String> = Vec::new();
        for round in rounds {
            parts.push(format!("\n--- Results for: {} ---", round.sub_query));
            for hit in &round.results {
                parts.push(tagged_excerpt(hit, self.config.multi_excerpt_chars));
            }
        }
        self.fit_budget(parts.join("\n"))
    }

    /// Context for a direct query: one tagged excerpt per line
    pub fn build_direct_context(&self, hits: &[ScoredPassage]) -> String {
        let lines: Vec<String> = hits
            .iter()
            .map(|hit| tagged_excerpt(hit, self.config.direct_excerpt_chars))
            .collect();
        self.fit_budget(lines.join("\n"))
    }

    fn fit_budget(&self, context: String) -> String {
        truncate_chars(&context, self.config.context_budget_chars).to_string()
    }

    /// Citations for every hit across rounds, in round order, capped at `limit`
    pub fn collect_citations(&self, rounds: &[RetrievalRound], limit: usize) -> Vec<Citation> {
        rounds
            .iter()
            .flat_map(|round| round.results.iter())
            .take(limit)
            .map(|hit| Citation::from_scored(hit, self.config.citation_excerpt_chars))
            .collect()
    }

    /// Answer a decomposed query from its retrieval rounds
    #[instrument(skip(self, sub_queries, rounds), fields(rounds = rounds.len()))]
    pub async fn synthesize_decomposed(
        &self,
        query: &str,
        sub_queries: Vec<String>,
        rounds: &[RetrievalRound],
    ) -> QueryResult {
        if rounds.iter().all(|round| round.results.is_empty()) {
            info!("No passages retrieved for any sub-query");
            return no_information(query, sub_queries);
        }

        let context = self.build_context(rounds);
        let prompt = format!(
            "Based on the following financial document excerpts, provide a comprehensive answer to the query.\n\
             Be specific with numbers and cite the companies/years when mentioning figures.\n\n\
             Query: {}\n\n\
             Context:\n{}\n\n\
             Provide a detailed, factual answer based only on the information in the context.\n\
             If you cannot find specific information, state that clearly.",
            query, context
        );

        match self
            .llm
            .complete(&prompt, self.config.temperature, self.config.multi_max_tokens)
            .await
        {
            Ok(answer) => {
                let reasoning = format!(
                    "Executed {} sub-queries: {}. Retrieved and analyzed relevant sections from SEC filings to provide comparative analysis.",
                    sub_queries.len(),
                    sub_queries.join(", ")
                );
                QueryResult {
                    query: query.to_string(),
                    answer,
                    reasoning,
                    sub_queries,
                    sources: self.collect_citations(rounds, self.config.max_citations_decomposed),
                }
            }
            Err(e) => {
                warn!(error = %e, "Answer synthesis failed");
                metrics::record_synthesis_failure(QueryMode::Decomposed.as_str());
                QueryResult {
                    query: query.to_string(),
                    answer: format!("Error generating answer: {}", e),
                    reasoning: SYNTHESIS_ERROR_REASONING.to_string(),
                    sub_queries,
                    sources: self.collect_citations(rounds, self.config.max_citations_direct),
                }
            }
        }
    }

    /// Answer a direct query from its single retrieval round
    #[instrument(skip(self, round), fields(results = round.results.len()))]
    pub async fn synthesize_direct(&self, query: &str, round: &RetrievalRound) -> QueryResult {
        if round.results.is_empty() {
            info!("No passages retrieved");
            return no_information(query, vec![query.to_string()]);
        }

        let context = self.build_direct_context(&round.results);
        let prompt = format!(
            "Answer this financial question based on the provided context.\n\
             Be specific and cite companies/years for any numbers mentioned.\n\n\
             Question: {}\n\
             Context: {}\n\n\
             Provide a direct, factual answer.",
            query, context
        );

        let answer = match self
            .llm
            .complete(&prompt, self.config.temperature, self.config.direct_max_tokens)
            .await
        {
            Ok(answer) => answer,
            Err(e) => {
                warn!(error = %e, "Answer synthesis failed");
                metrics::record_synthesis_failure(QueryMode::Direct.as_str());
                format!("Error generating answer: {}", e)
            }
        };

        QueryResult {
            query: query.to_string(),
            answer,
            reasoning: DIRECT_REASONING.to_string(),
            sub_queries: vec![query.to_string()],
            sources: self.collect_citations(
                std::slice::from_ref(round),
                self.config.max_citations_direct,
            ),
        }
    }
}

fn tagged_excerpt(hit: &ScoredPassage, max_chars: usize) -> String {
    format!("{}: {}", hit.passage.tag(), hit.passage.excerpt(max_chars))
}

fn no_information(query: &str, sub_queries: Vec<String>) -> QueryResult {
    QueryResult {
        query: query.to_string(),
        answer: NO_INFORMATION_ANSWER.to_string(),
        reasoning: NO_INFORMATION_REASONING.to_string(),
        sub_queries,
        sources: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use finrag_common::errors::{AppError, Result};
    use finrag_common::Passage;
    use std::sync::Mutex;

    /// Records prompts; answers with `reply` or fails when it is `None`
    struct RecordingModel {
        reply: Option<String>,
        calls: Mutex<Vec<(String, usize)>>,
    }

    impl RecordingModel {
        fn new(reply: Option<&str>) -> Arc<Self> {
            Arc::new(Self {
                reply: reply.map(str::to_string),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<(String, usize)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl LanguageModel for RecordingModel {
        async fn complete(&self, prompt: &str, _temperature: f32, max_tokens: usize) -> Result<String> {
            self.calls.lock().unwrap().push((prompt.to_string(), max_tokens));
            self.reply.clone().ok_or(AppError::Upstream {
                service: "chat".to_string(),
                status: 503,
                message: "unavailable".to_string(),
            })
        }

        fn model_name(&self) -> &str {
            "recording"
        }
    }

    fn hit(entity: &str, seq: usize, content: &str, score: f32) -> ScoredPassage {
        let passage = Passage::new(entity, "2024", format!("{}_2024_10K", entity), seq, content);
        ScoredPassage::new(Arc::new(passage), score)
    }

    fn round(sub_query: &str, results: Vec<ScoredPassage>) -> RetrievalRound {
        RetrievalRound {
            sub_query: sub_query.to_string(),
            entity_filter: None,
            results,
        }
    }

    #[test]
    fn test_context_layout() {
        let synth = AnswerSynthesizer::new(RecordingModel::new(Some("x")), SynthesisConfig::default());
        let rounds = vec![
            round("MSFT revenue", vec![hit("MSFT", 0, "Total revenue: $245.1 billion", 0.9)]),
            round("NVDA revenue", vec![hit("NVDA", 0, "Total revenue: $60.9 billion", 0.8)]),
        ];

        let context = synth.build_context(&rounds);
        assert_eq!(
            context,
            "\n--- Results for: MSFT revenue ---\n[MSFT 2024]: Total revenue: $245.1 billion\n\
             \n--- Results for: NVDA revenue ---\n[NVDA 2024]: Total revenue: $60.9 billion"
        );
    }

    #[test]
    fn test_context_respects_budget_and_excerpt_lengths() {
        let config = SynthesisConfig {
            context_budget_chars: 120,
            multi_excerpt_chars: 50,
            ..SynthesisConfig::default()
        };
        let synth = AnswerSynthesizer::new(RecordingModel::new(Some("x")), config);
        let long = "é".repeat(400);
        let rounds = vec![round("q", vec![hit("NVDA", 0, &long, 0.5), hit("NVDA", 1, &long, 0.4)])];

        let context = synth.build_context(&rounds);
        assert_eq!(context.chars().count(), 120);
        assert!(context.contains(&format!("[NVDA 2024]: {}...", "é".repeat(50))));
    }

    #[tokio::test]
    async fn test_direct_prompt_uses_short_excerpts() {
        let model = RecordingModel::new(Some("answer"));
        let synth = AnswerSynthesizer::new(model.clone(), SynthesisConfig::default());
        let long = "x".repeat(450);
        let direct = round("NVIDIA revenue", vec![hit("NVDA", 0, &long, 0.9)]);

        synth.synthesize_direct("NVIDIA revenue", &direct).await;

        let prompt = &model.calls()[0].0;
        let expected = format!("[NVDA 2024]: {}...", "x".repeat(300));
        assert!(prompt.contains(&expected));
        assert!(!prompt.contains(&"x".repeat(301)));
    }

    #[test]
    fn test_citations_capped_in_round_order() {
        let synth = AnswerSynthesizer::new(RecordingModel::new(Some("x")), SynthesisConfig::default());
        let rounds: Vec<RetrievalRound> = (0..4)
            .map(|r| {
                round(
                    &format!("q{}", r),
                    (0..3).map(|i| hit("MSFT", r * 3 + i, "cloud revenue", 0.5)).collect(),
                )
            })
            .collect();

        let citations = synth.collect_citations(&rounds, 10);
        assert_eq!(citations.len(), 10);
        assert_eq!(citations[0].chunk_id, "MSFT_2024_0");
        assert_eq!(citations[9].chunk_id, "MSFT_2024_9");
    }

    #[tokio::test]
    async fn test_decomposed_success() {
        let model = RecordingModel::new(Some("Microsoft reported $245.1B; NVIDIA $60.9B."));
        let synth = AnswerSynthesizer::new(model.clone(), SynthesisConfig::default());
        let sub_queries = vec!["MSFT revenue".to_string(), "NVDA revenue".to_string()];
        let rounds = vec![
            round("MSFT revenue", vec![hit("MSFT", 0, "Total revenue: $245.1 billion", 0.9)]),
            round("NVDA revenue", vec![hit("NVDA", 0, "Total revenue: $60.9 billion", 0.8)]),
        ];

        let result = synth
            .synthesize_decomposed("Compare Microsoft and NVIDIA revenue", sub_queries.clone(), &rounds)
            .await;

        assert_eq!(result.answer, "Microsoft reported $245.1B; NVIDIA $60.9B.");
        assert_eq!(result.sub_queries, sub_queries);
        assert_eq!(
            result.reasoning,
            "Executed 2 sub-queries: MSFT revenue, NVDA revenue. Retrieved and analyzed relevant sections from SEC filings to provide comparative analysis."
        );
        assert_eq!(result.sources.len(), 2);

        let calls = model.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].1, 500);
        assert!(calls[0].0.contains("Query: Compare Microsoft and NVIDIA revenue"));
        assert!(calls[0].0.contains("--- Results for: NVDA revenue ---"));
    }

    #[tokio::test]
    async fn test_decomposed_failure_keeps_partial_sources() {
        let synth = AnswerSynthesizer::new(RecordingModel::new(None), SynthesisConfig::default());
        let rounds = vec![round(
            "q",
            (0..8).map(|i| hit("GOOGL", i, "advertising revenue", 0.5)).collect(),
        )];

        let result = synth
            .synthesize_decomposed("Compare ads", vec!["q".to_string()], &rounds)
            .await;

        assert!(result.answer.starts_with("Error generating answer: "));
        assert!(result.answer.contains("503"));
        assert_eq!(result.reasoning, SYNTHESIS_ERROR_REASONING);
        assert_eq!(result.sub_queries, vec!["q"]);
        assert_eq!(result.sources.len(), 5);
    }

    #[tokio::test]
    async fn test_nothing_retrieved_skips_model() {
        let model = RecordingModel::new(Some("unused"));
        let synth = AnswerSynthesizer::new(model.clone(), SynthesisConfig::default());

        let result = synth.synthesize_direct("q", &round("q", Vec::new())).await;
        assert_eq!(result.answer, NO_INFORMATION_ANSWER);
        assert_eq!(result.reasoning, NO_INFORMATION_REASONING);
        assert_eq!(result.sub_queries, vec!["q"]);
        assert!(result.sources.is_empty());

        let rounds = vec![round("a", Vec::new()), round("b", Vec::new())];
        let result = synth
            .synthesize_decomposed("q", vec!["a".to_string(), "b".to_string()], &rounds)
            .await;
        assert_eq!(result.answer, NO_INFORMATION_ANSWER);
        assert_eq!(result.sub_queries, vec!["a", "b"]);

        assert!(model.calls().is_empty());
    }

    #[tokio::test]
    async fn test_direct_success_and_failure() {
        let model = RecordingModel::new(Some("NVIDIA's total revenue was $60.9 billion."));
        let synth = AnswerSynthesizer::new(model.clone(), SynthesisConfig::default());
        let hits: Vec<ScoredPassage> = (0..7).map(|i| hit("NVDA", i, "Total revenue", 0.7)).collect();
        let direct = round("NVIDIA revenue", hits);

        let result = synth.synthesize_direct("NVIDIA revenue", &direct).await;
        assert_eq!(result.answer, "NVIDIA's total revenue was $60.9 billion.");
        assert_eq!(result.reasoning, DIRECT_REASONING);
        assert_eq!(result.sub_queries, vec!["NVIDIA revenue"]);
        assert_eq!(result.sources.len(), 5);
        assert_eq!(model.calls()[0].1, 300);
        assert!(model.calls()[0].0.contains("[NVDA 2024]: Total revenue"));

        let failing = AnswerSynthesizer::new(RecordingModel::new(None), SynthesisConfig::default());
        let result = failing.synthesize_direct("NVIDIA revenue", &direct).await;
        assert!(result.answer.starts_with("Error generating answer: "));
        assert_eq!(result.reasoning, DIRECT_REASONING);
        assert_eq!(result.sources.len(), 5);
    }
}
