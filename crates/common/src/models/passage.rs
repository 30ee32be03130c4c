//! Passage (chunk) with provenance

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A bounded span of filing text tagged with provenance.
///
/// Passages are immutable once created. The chunk id is derived from
/// entity, period and sequence number, so it is unique per index as long as
/// each `(entity, period)` document is ingested once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Passage {
    /// `{entity}_{period}_{sequence}`
    pub chunk_id: String,

    /// Owning entity (e.g. a ticker such as `NVDA`)
    pub entity: String,

    /// Time period (e.g. fiscal year `2024`)
    pub period: String,

    /// Source document identifier
    pub source: String,

    /// Passage text, never empty
    pub content: String,

    /// Page number in the source document, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
}

impl Passage {
    /// Create a passage with a deterministic chunk id
    pub fn new(
        entity: impl Into<String>,
        period: impl Into<String>,
        source: impl Into<String>,
        sequence: usize,
        content: impl Into<String>,
    ) -> Self {
        let entity = entity.into();
        let period = period.into();
        let chunk_id = Self::chunk_id_for(&entity, &period, sequence);

        Self {
            chunk_id,
            entity,
            period,
            source: source.into(),
            content: content.into(),
            page: None,
        }
    }

    /// Attach a page number
    pub fn with_page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    /// Build the chunk id for an entity/period/sequence triple
    pub fn chunk_id_for(entity: &str, period: &str, sequence: usize) -> String {
        format!("{}_{}_{}", entity, period, sequence)
    }

    /// Provenance tag used in prompts, e.g. `[NVDA 2024]`
    pub fn tag(&self) -> String {
        format!("[{} {}]", self.entity, self.period)
    }

    /// First `max_chars` characters of the content, with `...` appended when cut
    pub fn excerpt(&self, max_chars: usize) -> String {
        let head = truncate_chars(&self.content, max_chars);
        if head.len() < self.content.len() {
            format!("{}...", head)
        } else {
            head.to_string()
        }
    }
}

/// A passage paired with its cosine similarity to a query.
///
/// The passage itself stays owned by the index; results share it read-only.
#[derive(Debug, Clone)]
pub struct ScoredPassage {
    pub passage: Arc<Passage>,

    /// Cosine similarity in [-1, 1]
    pub score: f32,
}

impl ScoredPassage {
    pub fn new(passage: Arc<Passage>, score: f32) -> Self {
        Self { passage, score }
    }
}

/// Truncate to at most `max_chars` characters without splitting a code point
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}
