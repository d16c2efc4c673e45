//! Capability traits consumed by the pipeline.
//!
//! Each external capability (classification, retrieval, SQL, synthesis) is
//! an opaque collaborator behind a narrow trait. Concrete adapters live in
//! `adapters`; deterministic test doubles implement the same traits.

use crate::state::{QueryType, Row};
use quarry_core::AppResult;

/// Outcome of the classification capability.
#[derive(Debug, Clone)]
pub struct Classification {
    /// Normalized intent label
    pub query_type: QueryType,

    /// Confidence in [0, 1]
    pub confidence: f64,

    /// Free text for observability; never used for control flow
    pub reasoning: String,
}

/// One ranked evidence snippet from retrieval.
#[derive(Debug, Clone)]
pub struct Snippet {
    /// Snippet body
    pub content: String,

    /// Title of the source document
    pub source: String,
}

/// Classifies a question against the current table and document inventories.
#[async_trait::async_trait]
pub trait QueryClassifier: Send + Sync {
    async fn classify(
        &self,
        question: &str,
        tables: &[String],
        documents: &[String],
    ) -> AppResult<Classification>;
}

/// Semantic search over ingested documents.
#[async_trait::async_trait]
pub trait Retriever: Send + Sync {
    /// Search for the top-k snippets matching the query. A non-empty
    /// `file_filter` restricts the search to the listed document titles.
    async fn search(
        &self,
        query: &str,
        k: usize,
        file_filter: &[String],
    ) -> AppResult<Vec<Snippet>>;

    /// Titles of all ingested documents (classification inventory).
    async fn document_titles(&self) -> AppResult<Vec<String>>;
}

/// Natural-language-to-SQL generation and execution.
#[async_trait::async_trait]
pub trait SqlBackend: Send + Sync {
    /// Names of the queryable tables (classification inventory).
    async fn table_names(&self) -> AppResult<Vec<String>>;

    /// Generate a query for the question. A non-empty `table_filter`
    /// restricts the schema shown to the generator to the listed tables.
    /// May return an empty string when nothing usable was produced.
    async fn generate_query(&self, question: &str, table_filter: &[String]) -> AppResult<String>;

    /// Execute a query. Invalid SQL must surface as an error; partial rows
    /// are never returned.
    async fn run(&self, query: &str) -> AppResult<Vec<Row>>;
}

/// Final answer synthesis from question plus gathered evidence.
#[async_trait::async_trait]
pub trait AnswerGenerator: Send + Sync {
    async fn generate(&self, question: &str, context: &str, model: &str) -> AppResult<String>;
}
