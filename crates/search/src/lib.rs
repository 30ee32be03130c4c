//! FinRAG Search Library
//!
//! Semantic vector index over filing passages:
//! - Embeds passages with a fixed [`Embedder`](finrag_common::Embedder)
//! - Stores L2-normalised vectors in a flat inner-product structure
//! - Top-k search with optional entity filtering

pub mod index;

pub use index::{FlatIndex, IndexStats, VectorIndex};
