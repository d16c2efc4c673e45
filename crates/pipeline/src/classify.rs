//! Classification stage.
//!
//! Gathers the table and document inventories (filtered by the request
//! allow-lists), asks the classifier for an intent label, and records the
//! routing decision in the state. This stage never fails the request: an
//! unreachable classifier routes to the general branch, which is always
//! answerable.

use crate::capabilities::{QueryClassifier, Retriever, SqlBackend};
use crate::state::{PipelineState, QueryType};
use std::time::Duration;

/// Restrict an inventory to the allow-list. An empty allow-list means no
/// restriction.
fn filter_inventory(items: Vec<String>, allowed: &[String]) -> Vec<String> {
    if allowed.is_empty() {
        items
    } else {
        items.into_iter().filter(|i| allowed.contains(i)).collect()
    }
}

/// Run the classification stage, writing `query_type` and the initial
/// metadata entries into the state.
pub async fn classify_stage(
    state: &mut PipelineState,
    classifier: &dyn QueryClassifier,
    retriever: &dyn Retriever,
    sql: &dyn SqlBackend,
    call_timeout: Duration,
) {
    // Inventory failures degrade to empty lists; classification still runs
    let tables = match sql.table_names().await {
        Ok(tables) => tables,
        Err(e) => {
            tracing::warn!("Could not list tables for classification: {}", e);
            Vec::new()
        }
    };

    let documents = match retriever.document_titles().await {
        Ok(titles) => titles,
        Err(e) => {
            tracing::warn!("Could not list documents for classification: {}", e);
            Vec::new()
        }
    };

    // A restricted request must be classified against the restricted
    // inventories only; the full catalog would skew the decision
    let tables = filter_inventory(tables, &state.config.allowed_tables);
    let documents = filter_inventory(documents, &state.config.allowed_documents);

    let outcome = tokio::time::timeout(
        call_timeout,
        classifier.classify(&state.question, &tables, &documents),
    )
    .await;

    match outcome {
        Ok(Ok(classification)) => {
            let confidence = classification.confidence.clamp(0.0, 1.0);

            tracing::info!(
                "Classified question as '{}' (confidence {:.2})",
                classification.query_type,
                confidence
            );

            state.query_type = Some(classification.query_type);
            state.insert_metadata("confidence", confidence);
            state.insert_metadata("reasoning", classification.reasoning);
        }
        Ok(Err(e)) => {
            tracing::warn!("Classifier unavailable ({}), defaulting to general", e);
            state.query_type = Some(QueryType::General);
            state.insert_metadata("confidence", 0.0);
            state.insert_metadata(
                "reasoning",
                format!("classification unavailable ({}), defaulted to general", e),
            );
        }
        Err(_) => {
            tracing::warn!(
                "Classification timed out after {}s, defaulting to general",
                call_timeout.as_secs()
            );
            state.query_type = Some(QueryType::General);
            state.insert_metadata("confidence", 0.0);
            state.insert_metadata("reasoning", "classification timed out, defaulted to general");
        }
    }
}
