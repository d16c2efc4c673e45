//! Pipeline orchestrator.
//!
//! Runs the classify → route → (retrieve | query | no-op) → synthesize
//! sequence over one fresh state per request. The flow is a strict DAG with
//! one fan-out (routing) and one convergence point (synthesis); no stage is
//! revisited and nothing outlives the call.

use crate::branches::{execute_sql_stage, retrieve_stage};
use crate::capabilities::{AnswerGenerator, QueryClassifier, Retriever, SqlBackend};
use crate::classify::classify_stage;
use crate::state::{PipelineResponse, PipelineState, QueryType, RequestConfig};
use crate::synthesize::synthesize_stage;
use quarry_core::{AppError, AppResult};
use std::sync::Arc;
use std::time::Duration;

/// Tunables shared by all invocations of one pipeline.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Model used when the request does not override it
    pub default_model: String,

    /// Snippets retrieved per document search
    pub top_k: usize,

    /// Bound on every external capability call
    pub call_timeout: Duration,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            default_model: "llama3.1:8b".to_string(),
            top_k: 4,
            call_timeout: Duration::from_secs(60),
        }
    }
}

/// Decide which branch handles the request.
///
/// Pure and total: routing depends solely on the classified query type.
/// Classification always sets it, but an absent value still routes to the
/// general branch rather than panicking.
pub fn route(state: &PipelineState) -> QueryType {
    state.query_type.unwrap_or(QueryType::General)
}

/// The query answering pipeline.
///
/// Capabilities are shared handles: one `Pipeline` serves any number of
/// concurrent `invoke` calls, each over its own private state.
pub struct Pipeline {
    classifier: Arc<dyn QueryClassifier>,
    retriever: Arc<dyn Retriever>,
    sql: Arc<dyn SqlBackend>,
    generator: Arc<dyn AnswerGenerator>,
    options: PipelineOptions,
}

impl Pipeline {
    /// Assemble a pipeline from its capabilities.
    pub fn new(
        classifier: Arc<dyn QueryClassifier>,
        retriever: Arc<dyn Retriever>,
        sql: Arc<dyn SqlBackend>,
        generator: Arc<dyn AnswerGenerator>,
        options: PipelineOptions,
    ) -> Self {
        Self {
            classifier,
            retriever,
            sql,
            generator,
            options,
        }
    }

    /// Answer one question.
    ///
    /// # Errors
    /// Only caller-input violations (an empty question) escape as `Err`;
    /// every capability failure downgrades to data in the response, so a
    /// well-formed request always yields a non-empty answer.
    pub async fn invoke(
        &self,
        question: &str,
        config: RequestConfig,
    ) -> AppResult<PipelineResponse> {
        let question = question.trim();
        if question.is_empty() {
            return Err(AppError::Pipeline("Question must not be empty".to_string()));
        }

        tracing::info!("Processing question");
        tracing::debug!("Question: {}", question);

        let mut state = PipelineState::new(question, config);

        classify_stage(
            &mut state,
            self.classifier.as_ref(),
            self.retriever.as_ref(),
            self.sql.as_ref(),
            self.options.call_timeout,
        )
        .await;

        match route(&state) {
            QueryType::Document => {
                retrieve_stage(
                    &mut state,
                    self.retriever.as_ref(),
                    self.options.top_k,
                    self.options.call_timeout,
                )
                .await;
            }
            QueryType::Sql => {
                execute_sql_stage(&mut state, self.sql.as_ref(), self.options.call_timeout).await;
            }
            QueryType::General => {
                tracing::debug!("General question, skipping evidence gathering");
            }
        }

        synthesize_stage(
            &mut state,
            self.generator.as_ref(),
            &self.options.default_model,
            self.options.call_timeout,
        )
        .await;

        tracing::info!(
            "Completed request (type: {}, error: {})",
            route(&state),
            state.error.is_some()
        );

        Ok(PipelineResponse::from_state(state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::branches::NO_EVIDENCE_MARKER;
    use crate::testing::{
        EchoGenerator, FailingGenerator, RecordingClassifier, StaticRetriever, StaticSql,
    };
    use quarry_prompt::NO_CONTEXT_PLACEHOLDER;
    use serde_json::{Map, Value};

    fn pipeline(
        classifier: RecordingClassifier,
        retriever: StaticRetriever,
        sql: StaticSql,
        generator: EchoGenerator,
    ) -> Pipeline {
        Pipeline::new(
            Arc::new(classifier),
            Arc::new(retriever),
            Arc::new(sql),
            Arc::new(generator),
            PipelineOptions::default(),
        )
    }

    fn count_row(n: i64) -> Map<String, Value> {
        let mut row = Map::new();
        row.insert("count".to_string(), Value::from(n));
        row
    }

    #[tokio::test]
    async fn test_empty_question_is_rejected() {
        let p = pipeline(
            RecordingClassifier::returning("general", 0.8, ""),
            StaticRetriever::with_titles(vec![]),
            StaticSql::with_tables(vec![]),
            EchoGenerator::new(),
        );

        let result = p.invoke("   ", RequestConfig::default()).await;
        assert!(matches!(result, Err(AppError::Pipeline(_))));
    }

    #[tokio::test]
    async fn test_general_question_skips_both_branches() {
        let generator = EchoGenerator::new();
        let p = Pipeline::new(
            Arc::new(RecordingClassifier::returning("general", 0.8, "chit-chat")),
            Arc::new(StaticRetriever::with_snippets(vec![("unused", "a.txt")])),
            Arc::new(StaticSql::with_tables(vec![]).generating("SELECT 1")),
            Arc::new(generator),
            PipelineOptions::default(),
        );

        let response = p.invoke("Hello", RequestConfig::default()).await.unwrap();

        assert_eq!(response.query_type, QueryType::General);
        assert!(response.context.is_empty());
        assert!(response.sql_query.is_empty());
        // Synthesis saw the explicit placeholder, not an empty string
        assert!(response.answer.contains(NO_CONTEXT_PLACEHOLDER));
    }

    #[tokio::test]
    async fn test_document_scenario() {
        let p = pipeline(
            RecordingClassifier::returning("document", 0.85, "asks about the handbook"),
            StaticRetriever::with_snippets(vec![
                ("Employees receive 25 days of leave.", "handbook.pdf"),
                ("Leave must be requested two weeks ahead.", "handbook.pdf"),
            ]),
            StaticSql::with_tables(vec![]),
            EchoGenerator::new(),
        );

        let response = p
            .invoke(
                "What does the handbook say about leave?",
                RequestConfig::default(),
            )
            .await
            .unwrap();

        assert_eq!(response.query_type, QueryType::Document);
        assert_eq!(
            response.context,
            "Employees receive 25 days of leave.\n\nLeave must be requested two weeks ahead."
        );
        assert!(response.answer.contains("25 days"));
        assert_eq!(response.metadata.get("retrieved_count"), Some(&2.into()));
    }

    #[tokio::test]
    async fn test_sql_scenario() {
        let p = pipeline(
            RecordingClassifier::returning("sql", 0.9, "count over customers table"),
            StaticRetriever::with_titles(vec![]),
            StaticSql::with_tables(vec!["customers".to_string()])
                .generating("SELECT COUNT(*) AS count FROM customers WHERE city = 'London'")
                .returning_rows(vec![count_row(2)]),
            EchoGenerator::new(),
        );

        let response = p
            .invoke(
                "How many customers are from London?",
                RequestConfig::default(),
            )
            .await
            .unwrap();

        assert_eq!(response.query_type, QueryType::Sql);
        assert!(response.sql_query.contains("WHERE city = 'London'"));
        assert!(response.context.contains("\"count\":2"));
        // The synthesized answer is grounded in the query result summary
        assert!(response.answer.contains("\"count\":2"));
    }

    #[tokio::test]
    async fn test_restricted_retrieval_with_no_matches_yields_marker() {
        let p = pipeline(
            RecordingClassifier::returning("document", 0.7, ""),
            StaticRetriever::with_snippets(vec![]),
            StaticSql::with_tables(vec![]),
            EchoGenerator::new(),
        );

        let config = RequestConfig {
            model: None,
            allowed_documents: vec!["a.pdf".to_string()],
            allowed_tables: vec![],
        };

        let response = p.invoke("anything relevant?", config).await.unwrap();

        assert_eq!(response.context, NO_EVIDENCE_MARKER);
        assert!(!response.answer.is_empty());
        // No error: empty results are a valid outcome, not a failure
        assert!(!response.answer.starts_with("I'm sorry"));
    }

    #[tokio::test]
    async fn test_empty_generated_query_surfaces_in_answer() {
        let p = pipeline(
            RecordingClassifier::returning("sql", 0.9, ""),
            StaticRetriever::with_titles(vec![]),
            StaticSql::with_tables(vec!["customers".to_string()]).generating(""),
            EchoGenerator::new(),
        );

        let response = p
            .invoke("Count the things", RequestConfig::default())
            .await
            .unwrap();

        assert!(response.answer.contains("Could not generate a query"));
        assert!(response.sql_query.is_empty());
    }

    #[tokio::test]
    async fn test_every_branch_failure_still_produces_an_answer() {
        // Retrieval failure
        let p = pipeline(
            RecordingClassifier::returning("document", 0.8, ""),
            StaticRetriever::failing("index corrupt"),
            StaticSql::with_tables(vec![]),
            EchoGenerator::new(),
        );
        let response = p.invoke("question", RequestConfig::default()).await.unwrap();
        assert!(!response.answer.is_empty());
        assert!(response.answer.contains("index corrupt"));

        // Execution failure
        let p = pipeline(
            RecordingClassifier::returning("sql", 0.8, ""),
            StaticRetriever::with_titles(vec![]),
            StaticSql::with_tables(vec!["t".to_string()])
                .generating("SELECT * FROM t")
                .failing_execution("database locked"),
            EchoGenerator::new(),
        );
        let response = p.invoke("question", RequestConfig::default()).await.unwrap();
        assert!(!response.answer.is_empty());
        assert!(response.answer.contains("database locked"));

        // Synthesis failure on the happy path
        let p = Pipeline::new(
            Arc::new(RecordingClassifier::returning("general", 0.8, "")),
            Arc::new(StaticRetriever::with_titles(vec![])),
            Arc::new(StaticSql::with_tables(vec![])),
            Arc::new(FailingGenerator::new("model gone")),
            PipelineOptions::default(),
        );
        let response = p.invoke("question", RequestConfig::default()).await.unwrap();
        assert!(!response.answer.is_empty());
        assert!(response.answer.contains("model gone"));
    }

    #[tokio::test]
    async fn test_arbitrary_classifier_label_is_coerced() {
        for label in ["DATABASE!!", "sql-ish", "unknown", ""] {
            let p = pipeline(
                RecordingClassifier::returning(label, 0.9, ""),
                StaticRetriever::with_titles(vec![]),
                StaticSql::with_tables(vec![]),
                EchoGenerator::new(),
            );

            let response = p.invoke("question", RequestConfig::default()).await.unwrap();
            assert_eq!(response.query_type, QueryType::General);
        }
    }

    #[tokio::test]
    async fn test_idempotent_for_deterministic_capabilities() {
        let make = || {
            pipeline(
                RecordingClassifier::returning("sql", 0.9, "same"),
                StaticRetriever::with_titles(vec![]),
                StaticSql::with_tables(vec!["customers".to_string()])
                    .generating("SELECT COUNT(*) AS count FROM customers")
                    .returning_rows(vec![count_row(5)]),
                EchoGenerator::new(),
            )
        };

        let first = make()
            .invoke("How many customers?", RequestConfig::default())
            .await
            .unwrap();
        let second = make()
            .invoke("How many customers?", RequestConfig::default())
            .await
            .unwrap();

        assert_eq!(first.query_type, second.query_type);
        assert_eq!(first.context, second.context);
        assert_eq!(first.sql_query, second.sql_query);
    }

    #[tokio::test]
    async fn test_concurrent_invocations_share_capabilities() {
        let p = Arc::new(pipeline(
            RecordingClassifier::returning("document", 0.8, ""),
            StaticRetriever::with_snippets(vec![("shared snippet", "a.txt")]),
            StaticSql::with_tables(vec![]),
            EchoGenerator::new(),
        ));

        let tasks: Vec<_> = (0..8)
            .map(|i| {
                let p = Arc::clone(&p);
                async move {
                    p.invoke(&format!("question {}", i), RequestConfig::default())
                        .await
                }
            })
            .collect();

        let responses = futures::future::join_all(tasks).await;

        for response in responses {
            let response = response.unwrap();
            assert_eq!(response.context, "shared snippet");
            assert!(!response.answer.is_empty());
        }
    }
}
