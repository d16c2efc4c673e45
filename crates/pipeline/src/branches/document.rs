//! Document retrieval branch.

use crate::capabilities::Retriever;
use crate::state::PipelineState;
use std::time::Duration;

/// Context marker written when retrieval ran but found nothing relevant.
///
/// Downstream synthesis must be able to distinguish "searched and found no
/// evidence" from "branch not attempted" (empty context), so this is never
/// the empty string.
pub const NO_EVIDENCE_MARKER: &str =
    "No relevant evidence was found in the selected documents.";

/// Run the document retrieval branch.
///
/// On success the snippet bodies are concatenated into `state.context`; on
/// empty results the no-evidence marker is written instead; on failure or
/// timeout the error is recorded and the context stays empty.
pub async fn retrieve_stage(
    state: &mut PipelineState,
    retriever: &dyn Retriever,
    top_k: usize,
    call_timeout: Duration,
) {
    let file_filter = state.config.allowed_documents.clone();

    if file_filter.is_empty() {
        tracing::info!("Retrieving top-{} snippets across all documents", top_k);
    } else {
        tracing::info!(
            "Retrieving top-{} snippets restricted to {} documents",
            top_k,
            file_filter.len()
        );
    }

    let outcome = tokio::time::timeout(
        call_timeout,
        retriever.search(&state.question, top_k, &file_filter),
    )
    .await;

    match outcome {
        Ok(Ok(snippets)) if !snippets.is_empty() => {
            state.context = snippets
                .iter()
                .map(|s| s.content.as_str())
                .collect::<Vec<_>>()
                .join("\n\n");
            state.insert_metadata("retrieved_count", snippets.len());

            tracing::info!("Retrieved {} snippets", snippets.len());
        }
        Ok(Ok(_)) => {
            tracing::info!("Retrieval found no relevant snippets");
            state.context = NO_EVIDENCE_MARKER.to_string();
            state.insert_metadata("retrieved_count", 0);
        }
        Ok(Err(e)) => {
            state.record_error(format!("Document retrieval failed: {}", e));
            state.context.clear();
        }
        Err(_) => {
            state.record_error(format!(
                "Document retrieval timed out after {}s",
                call_timeout.as_secs()
            ));
            state.context.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::RequestConfig;
    use crate::testing::StaticRetriever;

    const TIMEOUT: Duration = Duration::from_secs(5);

    #[tokio::test]
    async fn test_snippets_joined_with_blank_line() {
        let retriever = StaticRetriever::with_snippets(vec![
            ("first snippet", "a.txt"),
            ("second snippet", "a.txt"),
        ]);

        let mut state = PipelineState::new("question", RequestConfig::default());
        retrieve_stage(&mut state, &retriever, 4, TIMEOUT).await;

        assert_eq!(state.context, "first snippet\n\nsecond snippet");
        assert_eq!(state.metadata.get("retrieved_count"), Some(&2.into()));
        assert!(state.error.is_none());
    }

    #[tokio::test]
    async fn test_empty_results_write_marker() {
        let retriever = StaticRetriever::with_snippets(vec![]);

        let mut state = PipelineState::new("question", RequestConfig::default());
        retrieve_stage(&mut state, &retriever, 4, TIMEOUT).await;

        assert_eq!(state.context, NO_EVIDENCE_MARKER);
        assert!(state.error.is_none());
        assert_eq!(state.metadata.get("retrieved_count"), Some(&0.into()));
    }

    #[tokio::test]
    async fn test_failure_records_error_and_clears_context() {
        let retriever = StaticRetriever::failing("index unavailable");

        let mut state = PipelineState::new("question", RequestConfig::default());
        retrieve_stage(&mut state, &retriever, 4, TIMEOUT).await;

        assert!(state.context.is_empty());
        assert!(state
            .error
            .as_deref()
            .unwrap()
            .contains("index unavailable"));
    }

    #[tokio::test]
    async fn test_allow_list_passed_to_retriever() {
        let retriever = StaticRetriever::with_snippets(vec![("body", "a.pdf")]);

        let config = RequestConfig {
            model: None,
            allowed_documents: vec!["a.pdf".to_string()],
            allowed_tables: vec![],
        };

        let mut state = PipelineState::new("question", config);
        retrieve_stage(&mut state, &retriever, 4, TIMEOUT).await;

        assert_eq!(retriever.seen_filter(), vec!["a.pdf".to_string()]);
    }

    #[tokio::test]
    async fn test_slow_retriever_times_out() {
        let retriever = StaticRetriever::slow(Duration::from_secs(2));

        let mut state = PipelineState::new("question", RequestConfig::default());
        retrieve_stage(&mut state, &retriever, 4, Duration::from_millis(50)).await;

        assert!(state.context.is_empty());
        assert!(state.error.as_deref().unwrap().contains("timed out"));
    }
}
