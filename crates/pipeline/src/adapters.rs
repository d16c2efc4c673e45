//! Concrete capability adapters.
//!
//! One adapter per capability, bridging the backend crates (llm, knowledge,
//! sql) to the pipeline's trait seams. Test doubles implement the same
//! traits; nothing in the stages knows which side it is talking to.

use crate::capabilities::{
    AnswerGenerator, Classification, QueryClassifier, Retriever, Snippet, SqlBackend,
};
use crate::state::{QueryType, Row};
use quarry_core::AppResult;
use quarry_knowledge::DocumentStore;
use quarry_llm::{GenerateRequest, LlmClient};
use quarry_prompt::{classification_prompt, synthesis_prompt};
use quarry_sql::{SqlEngine, SqlGenerator};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

/// Confidence assumed when the classifier omits or garbles the score.
const DEFAULT_CONFIDENCE: f64 = 0.8;

/// Maximum tokens for a classification reply.
const MAX_CLASSIFY_TOKENS: u32 = 256;

/// Maximum tokens for a synthesized answer.
const MAX_ANSWER_TOKENS: u32 = 1024;

/// LLM-backed question classifier.
pub struct LlmQueryClassifier {
    client: Arc<dyn LlmClient>,
    model: String,
}

impl LlmQueryClassifier {
    pub fn new(client: Arc<dyn LlmClient>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }
}

#[async_trait::async_trait]
impl QueryClassifier for LlmQueryClassifier {
    async fn classify(
        &self,
        question: &str,
        tables: &[String],
        documents: &[String],
    ) -> AppResult<Classification> {
        let prompt = classification_prompt(question, tables, documents)?;

        let request = GenerateRequest::new(prompt, &self.model)
            .with_temperature(0.0)
            .with_max_tokens(MAX_CLASSIFY_TOKENS);

        let response = self.client.complete(&request).await?;
        Ok(parse_classification(&response.content))
    }
}

/// Raw shape of the classifier's JSON reply.
#[derive(Debug, Deserialize)]
struct RawClassification {
    query_type: Option<String>,
    confidence: Option<Value>,
    reasoning: Option<String>,
}

/// Find the outermost JSON object in possibly-fenced model output.
fn extract_json_object(content: &str) -> Option<&str> {
    let start = content.find('{')?;
    let end = content.rfind('}')?;
    (end >= start).then(|| &content[start..=end])
}

/// Confidence may arrive as a number or a numeric string.
fn parse_confidence(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(DEFAULT_CONFIDENCE),
        Value::String(s) => s.trim().parse().unwrap_or(DEFAULT_CONFIDENCE),
        _ => DEFAULT_CONFIDENCE,
    }
}

/// Parse a raw classifier reply leniently.
///
/// Accepts a bare JSON object, a fenced or prose-wrapped object, or as a
/// last resort the whole reply as a bare label. Unknown labels coerce to
/// `general` and a missing confidence defaults rather than failing the
/// request.
fn parse_classification(content: &str) -> Classification {
    if let Some(json) = extract_json_object(content) {
        if let Ok(raw) = serde_json::from_str::<RawClassification>(json) {
            return Classification {
                query_type: QueryType::from_label(raw.query_type.as_deref().unwrap_or("")),
                confidence: raw
                    .confidence
                    .as_ref()
                    .map(parse_confidence)
                    .unwrap_or(DEFAULT_CONFIDENCE),
                reasoning: raw.reasoning.unwrap_or_default(),
            };
        }
    }

    Classification {
        query_type: QueryType::from_label(content),
        confidence: DEFAULT_CONFIDENCE,
        reasoning: String::new(),
    }
}

/// Retriever over the document store.
pub struct StoreRetriever {
    store: Arc<DocumentStore>,
}

impl StoreRetriever {
    pub fn new(store: Arc<DocumentStore>) -> Self {
        Self { store }
    }
}

#[async_trait::async_trait]
impl Retriever for StoreRetriever {
    async fn search(
        &self,
        query: &str,
        k: usize,
        file_filter: &[String],
    ) -> AppResult<Vec<Snippet>> {
        let hits = self.store.search(query, k, file_filter).await?;

        Ok(hits
            .into_iter()
            .map(|hit| Snippet {
                content: hit.content,
                source: hit.source,
            })
            .collect())
    }

    async fn document_titles(&self) -> AppResult<Vec<String>> {
        self.store.titles().await
    }
}

/// SQL backend over the SQLite engine plus the text-to-SQL generator.
pub struct SqliteBackend {
    engine: Arc<SqlEngine>,
    generator: SqlGenerator,
}

impl SqliteBackend {
    pub fn new(engine: Arc<SqlEngine>, generator: SqlGenerator) -> Self {
        Self { engine, generator }
    }
}

#[async_trait::async_trait]
impl SqlBackend for SqliteBackend {
    async fn table_names(&self) -> AppResult<Vec<String>> {
        self.engine.table_names()
    }

    async fn generate_query(&self, question: &str, table_filter: &[String]) -> AppResult<String> {
        // The allow-list filters the schema handed to generation, so the
        // model cannot see (or hallucinate from) restricted tables
        let schema = self.engine.render_schema(table_filter)?;
        self.generator.generate_query(question, &schema).await
    }

    async fn run(&self, query: &str) -> AppResult<Vec<Row>> {
        self.engine.run(query)
    }
}

/// LLM-backed answer generator.
pub struct LlmAnswerGenerator {
    client: Arc<dyn LlmClient>,
}

impl LlmAnswerGenerator {
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl AnswerGenerator for LlmAnswerGenerator {
    async fn generate(&self, question: &str, context: &str, model: &str) -> AppResult<String> {
        let prompt = synthesis_prompt(question, context)?;

        let request = GenerateRequest::new(prompt, model)
            .with_temperature(0.3)
            .with_max_tokens(MAX_ANSWER_TOKENS);

        let response = self.client.complete(&request).await?;
        Ok(response.content)
    }
}
