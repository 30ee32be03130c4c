//! FinRAG Context Engine
//!
//! Retrieval-and-reasoning core answering financial questions:
//! - Query planning (direct vs. decomposed into sub-queries)
//! - Entity-scoped retrieval orchestration over the vector index
//! - Context assembly and cited answer synthesis
//! - Setup pipeline from a filing corpus to a populated index

pub mod agent;
pub mod engine;
pub mod entities;
pub mod planner;
pub mod retrieval;
pub mod synthesizer;

pub use agent::{QueryAgent, QueryOutcome};
pub use engine::{persist_results, ContextEngine, SAMPLE_QUERIES};
pub use entities::EntityResolver;
pub use planner::{needs_decomposition, QueryPlan, QueryPlanner};
pub use retrieval::{RetrievalOrchestrator, RetrievalRound};
pub use synthesizer::AnswerSynthesizer;
