//! Text chunking module
//!
//! Splits filing text into overlapping, word-bounded passages. Sentences are
//! never cut: the size check only runs between sentences, so a single
//! oversized sentence still lands whole in one passage.

use finrag_common::config::ChunkingConfig;
use finrag_common::Passage;
use regex_lite::Regex;
use tracing::debug;

use crate::errors::IngestionError;

/// Sentence-aware chunker producing [`Passage`]s
pub struct Chunker {
    config: ChunkingConfig,
    boundary: Regex,
}

impl Chunker {
    /// Create a new chunker
    pub fn new(config: ChunkingConfig) -> Result<Self, IngestionError> {
        let boundary = Regex::new(r"[.!?]\s+")
            .map_err(|e| IngestionError::ChunkingError(e.to_string()))?;
        Ok(Self { config, boundary })
    }

    /// Split `text` into passages tagged with `entity`, `period` and `source`.
    ///
    /// Chunk ids are `{entity}_{period}_{n}` with `n` counting from 0.
    pub fn chunk(&self, text: &str, entity: &str, period: &str, source: &str) -> Vec<Passage> {
        let mut passages = Vec::new();
        let mut buffer = String::new();
        let mut buffer_words = 0;

        for sentence in self.split_sentences(text) {
            let sentence_words = word_count(sentence);
            if sentence_words == 0 {
                continue;
            }

            if buffer_words + sentence_words > self.config.chunk_size && !buffer.trim().is_empty() {
                passages.push(Passage::new(
                    entity,
                    period,
                    source,
                    passages.len(),
                    buffer.trim(),
                ));

                let mut next = self.overlap_tail(&buffer);
                next.push(' ');
                next.push_str(sentence);
                buffer = next;
                buffer_words = word_count(&buffer);
            } else {
                buffer.push(' ');
                buffer.push_str(sentence);
                buffer_words += sentence_words;
            }
        }

        if !buffer.trim().is_empty() {
            passages.push(Passage::new(
                entity,
                period,
                source,
                passages.len(),
                buffer.trim(),
            ));
        }

        debug!(
            entity = entity,
            period = period,
            input_len = text.len(),
            chunk_count = passages.len(),
            chunk_size = self.config.chunk_size,
            "Text chunked"
        );

        passages
    }

    /// Split on `.`, `!` or `?` followed by whitespace, keeping the punctuation
    fn split_sentences<'a>(&self, text: &'a str) -> Vec<&'a str> {
        let mut sentences = Vec::new();
        let mut start = 0;

        for boundary in self.boundary.find_iter(text) {
            // Punctuation is a single ASCII byte
            sentences.push(&text[start..boundary.start() + 1]);
            start = boundary.end();
        }
        sentences.push(&text[start..]);

        sentences
    }

    /// Trailing `overlap` words of a closed chunk, or the whole chunk when it is shorter
    fn overlap_tail(&self, closed: &str) -> String {
        let words: Vec<&str> = closed.split_whitespace().collect();
        if words.len() > self.config.overlap {
            words[words.len() - self.config.overlap..].join(" ")
        } else {
            closed.trim().to_string()
        }
    }
}

fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}
