//! Deterministic capability doubles shared by the pipeline tests.

use crate::capabilities::{
    AnswerGenerator, Classification, QueryClassifier, Retriever, Snippet, SqlBackend,
};
use crate::state::{QueryType, Row};
use quarry_core::{AppError, AppResult};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Classifier returning a fixed outcome and recording the inventories it saw.
pub struct RecordingClassifier {
    label: String,
    confidence: f64,
    reasoning: String,
    failure: Option<String>,
    seen: Mutex<(Vec<String>, Vec<String>)>,
}

impl RecordingClassifier {
    pub fn returning(label: &str, confidence: f64, reasoning: &str) -> Self {
        Self {
            label: label.to_string(),
            confidence,
            reasoning: reasoning.to_string(),
            failure: None,
            seen: Mutex::new((Vec::new(), Vec::new())),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            label: String::new(),
            confidence: 0.0,
            reasoning: String::new(),
            failure: Some(message.to_string()),
            seen: Mutex::new((Vec::new(), Vec::new())),
        }
    }

    /// The (tables, documents) inventories from the last classify call.
    pub fn seen_inventories(&self) -> (Vec<String>, Vec<String>) {
        self.seen.lock().expect("lock poisoned").clone()
    }
}

#[async_trait::async_trait]
impl QueryClassifier for RecordingClassifier {
    async fn classify(
        &self,
        _question: &str,
        tables: &[String],
        documents: &[String],
    ) -> AppResult<Classification> {
        *self.seen.lock().expect("lock poisoned") = (tables.to_vec(), documents.to_vec());

        if let Some(message) = &self.failure {
            return Err(AppError::Llm(message.clone()));
        }

        Ok(Classification {
            query_type: QueryType::from_label(&self.label),
            confidence: self.confidence,
            reasoning: self.reasoning.clone(),
        })
    }
}

/// Retriever returning fixed snippets and recording the filter it saw.
pub struct StaticRetriever {
    titles: Vec<String>,
    snippets: Vec<Snippet>,
    failure: Option<String>,
    delay: Option<Duration>,
    seen_filter: Mutex<Vec<String>>,
}

impl StaticRetriever {
    pub fn with_titles(titles: Vec<String>) -> Self {
        Self {
            titles,
            snippets: Vec::new(),
            failure: None,
            delay: None,
            seen_filter: Mutex::new(Vec::new()),
        }
    }

    pub fn with_snippets(snippets: Vec<(&str, &str)>) -> Self {
        Self {
            titles: Vec::new(),
            snippets: snippets
                .into_iter()
                .map(|(content, source)| Snippet {
                    content: content.to_string(),
                    source: source.to_string(),
                })
                .collect(),
            failure: None,
            delay: None,
            seen_filter: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            titles: Vec::new(),
            snippets: Vec::new(),
            failure: Some(message.to_string()),
            delay: None,
            seen_filter: Mutex::new(Vec::new()),
        }
    }

    pub fn slow(delay: Duration) -> Self {
        Self {
            titles: Vec::new(),
            snippets: Vec::new(),
            failure: None,
            delay: Some(delay),
            seen_filter: Mutex::new(Vec::new()),
        }
    }

    pub fn seen_filter(&self) -> Vec<String> {
        self.seen_filter.lock().expect("lock poisoned").clone()
    }
}

#[async_trait::async_trait]
impl Retriever for StaticRetriever {
    async fn search(
        &self,
        _query: &str,
        _k: usize,
        file_filter: &[String],
    ) -> AppResult<Vec<Snippet>> {
        *self.seen_filter.lock().expect("lock poisoned") = file_filter.to_vec();

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(message) = &self.failure {
            return Err(AppError::Knowledge(message.clone()));
        }

        Ok(self.snippets.clone())
    }

    async fn document_titles(&self) -> AppResult<Vec<String>> {
        Ok(self.titles.clone())
    }
}

/// SQL backend with scripted generation and execution outcomes.
pub struct StaticSql {
    tables: Vec<String>,
    generated: Option<String>,
    generation_failure: Option<String>,
    rows: Vec<Row>,
    execution_failure: Option<String>,
    run_called: AtomicBool,
    seen_table_filter: Mutex<Vec<String>>,
}

impl StaticSql {
    pub fn with_tables(tables: Vec<String>) -> Self {
        Self {
            tables,
            generated: None,
            generation_failure: None,
            rows: Vec::new(),
            execution_failure: None,
            run_called: AtomicBool::new(false),
            seen_table_filter: Mutex::new(Vec::new()),
        }
    }

    pub fn generating(mut self, query: &str) -> Self {
        self.generated = Some(query.to_string());
        self
    }

    pub fn failing_generation(mut self, message: &str) -> Self {
        self.generation_failure = Some(message.to_string());
        self
    }

    pub fn returning_rows(mut self, rows: Vec<Row>) -> Self {
        self.rows = rows;
        self
    }

    pub fn failing_execution(mut self, message: &str) -> Self {
        self.execution_failure = Some(message.to_string());
        self
    }

    pub fn run_was_called(&self) -> bool {
        self.run_called.load(Ordering::SeqCst)
    }

    pub fn seen_table_filter(&self) -> Vec<String> {
        self.seen_table_filter.lock().expect("lock poisoned").clone()
    }
}

#[async_trait::async_trait]
impl SqlBackend for StaticSql {
    async fn table_names(&self) -> AppResult<Vec<String>> {
        Ok(self.tables.clone())
    }

    async fn generate_query(&self, _question: &str, table_filter: &[String]) -> AppResult<String> {
        *self.seen_table_filter.lock().expect("lock poisoned") = table_filter.to_vec();

        if let Some(message) = &self.generation_failure {
            return Err(AppError::Sql(message.clone()));
        }

        Ok(self.generated.clone().unwrap_or_default())
    }

    async fn run(&self, _query: &str) -> AppResult<Vec<Row>> {
        self.run_called.store(true, Ordering::SeqCst);

        if let Some(message) = &self.execution_failure {
            return Err(AppError::Sql(message.clone()));
        }

        Ok(self.rows.clone())
    }
}

/// Generator echoing its inputs, recording what it was called with.
pub struct EchoGenerator {
    called: AtomicBool,
    seen: Mutex<(String, String)>,
}

impl EchoGenerator {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self {
            called: AtomicBool::new(false),
            seen: Mutex::new((String::new(), String::new())),
        }
    }

    pub fn was_called(&self) -> bool {
        self.called.load(Ordering::SeqCst)
    }

    pub fn seen_context(&self) -> String {
        self.seen.lock().expect("lock poisoned").0.clone()
    }

    pub fn seen_model(&self) -> String {
        self.seen.lock().expect("lock poisoned").1.clone()
    }
}

#[async_trait::async_trait]
impl AnswerGenerator for EchoGenerator {
    async fn generate(&self, question: &str, context: &str, model: &str) -> AppResult<String> {
        self.called.store(true, Ordering::SeqCst);
        *self.seen.lock().expect("lock poisoned") = (context.to_string(), model.to_string());

        Ok(format!("Answer to '{}': {}", question, context))
    }
}

/// Generator that always fails.
pub struct FailingGenerator {
    message: String,
}

impl FailingGenerator {
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

#[async_trait::async_trait]
impl AnswerGenerator for FailingGenerator {
    async fn generate(&self, _question: &str, _context: &str, _model: &str) -> AppResult<String> {
        Err(AppError::Llm(self.message.clone()))
    }
}
