//! Query result and citation records

use super::passage::ScoredPassage;
use serde::{Deserialize, Serialize};

/// How a top-level query was executed
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum QueryMode {
    /// Single retrieval round for the original question
    Direct,
    /// One retrieval round per generated sub-query
    Decomposed,
}

impl QueryMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryMode::Direct => "direct",
            QueryMode::Decomposed => "decomposed",
        }
    }
}

/// Source citation attached to an answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    pub entity: String,
    pub period: String,
    pub excerpt: String,
    pub chunk_id: String,
    pub score: f32,
}

impl Citation {
    /// Build a citation from a search hit with a shortened excerpt
    pub fn from_scored(hit: &ScoredPassage, excerpt_chars: usize) -> Self {
        Self {
            entity: hit.passage.entity.clone(),
            period: hit.passage.period.clone(),
            excerpt: hit.passage.excerpt(excerpt_chars),
            chunk_id: hit.passage.chunk_id.clone(),
            score: hit.score,
        }
    }
}

/// Final result of one top-level question
///
/// This is the record shape exported by the CLI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub query: String,
    pub answer: String,
    pub reasoning: String,
    pub sub_queries: Vec<String>,
    pub sources: Vec<Citation>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Passage;
    use std::sync::Arc;

    #[test]
    fn test_citation_from_hit() {
        let passage = Arc::new(Passage::new(
            "GOOGL",
            "2023",
            "GOOGL_2023_10K",
            7,
            "Advertising revenue was $237.9 billion.",
        ));
        let citation = Citation::from_scored(&ScoredPassage::new(passage, 0.82), 11);

        assert_eq!(citation.entity, "GOOGL");
        assert_eq!(citation.period, "2023");
        assert_eq!(citation.chunk_id, "GOOGL_2023_7");
        assert_eq!(citation.excerpt, "Advertising...");
        assert!((citation.score - 0.82).abs() < f32::EPSILON);
    }

    #[test]
    fn test_query_result_record_shape() {
        let result = QueryResult {
            query: "q".into(),
            answer: "a".into(),
            reasoning: "r".into(),
            sub_queries: vec!["q".into()],
            sources: vec![Citation {
                entity: "NVDA".into(),
                period: "2024".into(),
                excerpt: "Total revenue".into(),
                chunk_id: "NVDA_2024_0".into(),
                score: 0.5,
            }],
        };

        let json = serde_json::to_value(&result).unwrap();
        let keys: Vec<&str> = json.as_object().unwrap().keys().map(|k| k.as_str()).collect();
        for key in ["query", "answer", "reasoning", "sub_queries", "sources"] {
            assert!(keys.contains(&key), "missing {key}");
        }
        assert_eq!(json["sources"][0]["chunk_id"], "NVDA_2024_0");
        assert_eq!(json["sources"][0]["entity"], "NVDA");
    }
}
