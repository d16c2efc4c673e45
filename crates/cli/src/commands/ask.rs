//! Ask command handler.
//!
//! Assembles the capability stack from configuration, runs the pipeline for
//! one question, and prints the answer.

use clap::Args;
use quarry_core::{config::AppConfig, AppError, AppResult};
use quarry_knowledge::DocumentStore;
use quarry_llm::{LlmClient, OllamaClient};
use quarry_pipeline::{
    LlmAnswerGenerator, LlmQueryClassifier, Pipeline, PipelineOptions, RequestConfig,
    SqliteBackend, StoreRetriever,
};
use quarry_sql::{SqlEngine, SqlGenerator};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Ask a question
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    pub question: Option<String>,

    /// Read the question from a file
    #[arg(short, long)]
    pub file: Option<PathBuf>,

    /// Restrict document search to these titles (repeatable)
    #[arg(long = "document", value_name = "TITLE")]
    pub documents: Vec<String>,

    /// Restrict SQL generation to these tables (repeatable)
    #[arg(long = "table", value_name = "NAME")]
    pub tables: Vec<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    /// Execute the ask command.
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command");
        tracing::debug!("Ask command options: {:?}", self);

        let question = self
            .get_question()
            .ok_or_else(|| AppError::Config("No question provided".to_string()))?;

        let pipeline = build_pipeline(config)?;

        let request = RequestConfig {
            model: None,
            allowed_documents: self.documents.clone(),
            allowed_tables: self.tables.clone(),
        };

        let response = pipeline.invoke(&question, request).await?;

        if self.json {
            let output = serde_json::json!({
                "answer": response.answer,
                "queryType": response.query_type,
                "context": response.context,
                "sqlQuery": response.sql_query,
                "metadata": response.metadata,
            });

            let json = serde_json::to_string_pretty(&output)
                .map_err(|e| AppError::Serialization(e.to_string()))?;
            println!("{}", json);
        } else {
            println!("{}", response.answer);

            tracing::debug!(
                "Handled as '{}' (sql: {:?})",
                response.query_type,
                response.sql_query
            );
        }

        Ok(())
    }

    /// Get the question text from the positional argument or a file.
    fn get_question(&self) -> Option<String> {
        self.question.clone().or_else(|| {
            self.file.as_ref().and_then(|path| {
                std::fs::read_to_string(path)
                    .map_err(|e| tracing::error!("Failed to read question file: {}", e))
                    .ok()
            })
        })
    }
}

/// Assemble the pipeline from the application configuration.
///
/// The same shared handles (LLM client, document store, SQL engine) back
/// every capability; concurrent invocations are safe.
pub fn build_pipeline(config: &AppConfig) -> AppResult<Pipeline> {
    let llm: Arc<dyn LlmClient> = Arc::new(OllamaClient::with_options(
        &config.endpoint,
        config.timeout_secs,
    ));

    let embedder = quarry_knowledge::create_provider(
        "ollama",
        &config.endpoint,
        &config.embedding_model,
        config.embedding_dim as usize,
    )?;

    let store = Arc::new(DocumentStore::open(
        &config.index_path(),
        embedder,
        config.chunk_size,
        config.chunk_overlap,
    )?);

    let engine = Arc::new(SqlEngine::open(config.database_path()));
    let generator = SqlGenerator::new(llm.clone(), &config.model);

    let options = PipelineOptions {
        default_model: config.model.clone(),
        top_k: config.top_k as usize,
        call_timeout: Duration::from_secs(config.timeout_secs),
    };

    Ok(Pipeline::new(
        Arc::new(LlmQueryClassifier::new(llm.clone(), &config.model)),
        Arc::new(StoreRetriever::new(store)),
        Arc::new(SqliteBackend::new(engine, generator)),
        Arc::new(LlmAnswerGenerator::new(llm)),
        options,
    ))
}
