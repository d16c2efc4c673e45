//! Query answering pipeline for quarry.
//!
//! Implements the classify → route → (retrieve | query | passthrough) →
//! synthesize sequence over a per-request state record. Capabilities
//! (classification, retrieval, SQL, synthesis) sit behind traits; concrete
//! adapters over the backend crates live in [`adapters`].

pub mod adapters;
pub mod branches;
pub mod capabilities;
pub mod classify;
pub mod orchestrator;
pub mod state;
pub mod synthesize;

#[cfg(test)]
pub(crate) mod testing;

// Re-export the main types
pub use adapters::{LlmAnswerGenerator, LlmQueryClassifier, SqliteBackend, StoreRetriever};
pub use branches::NO_EVIDENCE_MARKER;
pub use capabilities::{
    AnswerGenerator, Classification, QueryClassifier, Retriever, Snippet, SqlBackend,
};
pub use orchestrator::{route, Pipeline, PipelineOptions};
pub use state::{PipelineResponse, PipelineState, QueryType, RequestConfig, Row};
