//! Per-request pipeline state.
//!
//! One `PipelineState` is created per `invoke` call, threaded through the
//! stages in order, and discarded once the response has been produced. It is
//! never shared across requests and never touched by more than one stage at
//! a time.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The three mutually exclusive execution branches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryType {
    Document,
    Sql,
    General,
}

impl QueryType {
    /// Parse a raw classifier label.
    ///
    /// Anything outside the three known labels is coerced to `General`:
    /// ambiguous intent routes to the always-available branch.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "document" => QueryType::Document,
            "sql" => QueryType::Sql,
            "general" => QueryType::General,
            _ => QueryType::General,
        }
    }

    /// The wire label for this query type.
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryType::Document => "document",
            QueryType::Sql => "sql",
            QueryType::General => "general",
        }
    }
}

impl std::fmt::Display for QueryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable per-request configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestConfig {
    /// Model override for this request (None = system default)
    pub model: Option<String>,

    /// Restrict retrieval to these document titles (empty = unrestricted)
    pub allowed_documents: Vec<String>,

    /// Restrict SQL generation to these tables (empty = unrestricted)
    pub allowed_tables: Vec<String>,
}

/// A SQL result row: column name mapped to a JSON value.
pub type Row = Map<String, Value>;

/// Mutable state threaded through one pipeline invocation.
#[derive(Debug, Clone)]
pub struct PipelineState {
    /// The original question; immutable after creation
    pub question: String,

    /// Set exactly once by the classification stage
    pub query_type: Option<QueryType>,

    /// Accumulated evidence text; empty until a branch populates it
    pub context: String,

    /// Generated query text, if the SQL branch ran
    pub sql_query: String,

    /// Result rows, if the SQL branch ran and executed successfully
    pub sql_result: Vec<Row>,

    /// Final prose; populated by the synthesis stage
    pub answer: String,

    /// Branch failure description; setting it is the only way a branch
    /// signals failure, and it is never cleared once set
    pub error: Option<String>,

    /// Auxiliary diagnostics (confidence, reasoning, retrieved count);
    /// append-only within a request
    pub metadata: Map<String, Value>,

    /// The request configuration, read-only through all stages
    pub config: RequestConfig,
}

impl PipelineState {
    /// Create a fresh state for one invocation.
    pub fn new(question: impl Into<String>, config: RequestConfig) -> Self {
        Self {
            question: question.into(),
            query_type: None,
            context: String::new(),
            sql_query: String::new(),
            sql_result: Vec::new(),
            answer: String::new(),
            error: None,
            metadata: Map::new(),
            config,
        }
    }

    /// Record a branch failure. The first error wins; later stages must
    /// never overwrite or clear it.
    pub fn record_error(&mut self, message: impl Into<String>) {
        if self.error.is_none() {
            let message = message.into();
            tracing::warn!("Pipeline branch failure: {}", message);
            self.error = Some(message);
        }
    }

    /// Append a metadata entry.
    pub fn insert_metadata(&mut self, key: &str, value: impl Into<Value>) {
        self.metadata.insert(key.to_string(), value.into());
    }
}

/// The caller-facing subset of the terminal state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineResponse {
    /// Final answer prose; never empty
    pub answer: String,

    /// The branch that handled the request
    pub query_type: QueryType,

    /// Evidence the answer was grounded in (may be empty for general)
    pub context: String,

    /// Generated SQL, if the SQL branch ran
    pub sql_query: String,

    /// Diagnostic metadata (confidence, reasoning, retrieved count)
    pub metadata: Map<String, Value>,
}

impl PipelineResponse {
    /// Extract the caller-relevant fields from a terminal state.
    pub fn from_state(state: PipelineState) -> Self {
        Self {
            answer: state.answer,
            query_type: state.query_type.unwrap_or(QueryType::General),
            context: state.context,
            sql_query: state.sql_query,
            metadata: state.metadata,
        }
    }
}
