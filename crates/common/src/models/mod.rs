//! Core data model
//!
//! Passages are the unit of retrieval; query results are the stable output
//! shape persisted by the CLI.

mod passage;
mod query;

pub use passage::{truncate_chars, Passage, ScoredPassage};
pub use query::{Citation, QueryMode, QueryResult};
