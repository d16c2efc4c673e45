//! SQL branch: query generation followed by execution.

use crate::capabilities::SqlBackend;
use crate::state::{PipelineState, Row};
use serde_json::Value;
use std::time::Duration;

/// Run the SQL branch.
///
/// Generation runs first; an empty generated query is a failure and is
/// never executed. On successful execution the rows land in
/// `state.sql_result` and a query+result summary becomes the context the
/// synthesis stage reads. On any failure the error is recorded and the
/// context is left untouched.
pub async fn execute_sql_stage(
    state: &mut PipelineState,
    backend: &dyn SqlBackend,
    call_timeout: Duration,
) {
    let table_filter = state.config.allowed_tables.clone();

    let generated = match tokio::time::timeout(
        call_timeout,
        backend.generate_query(&state.question, &table_filter),
    )
    .await
    {
        Ok(Ok(query)) => query,
        Ok(Err(e)) => {
            state.record_error(format!("Query generation failed: {}", e));
            return;
        }
        Err(_) => {
            state.record_error(format!(
                "Query generation timed out after {}s",
                call_timeout.as_secs()
            ));
            return;
        }
    };

    let generated = generated.trim().to_string();
    if generated.is_empty() {
        state.record_error("Could not generate a query for this question");
        return;
    }

    tracing::info!("Generated SQL query");
    tracing::debug!("Query: {}", generated);
    state.sql_query = generated;

    let outcome = tokio::time::timeout(call_timeout, backend.run(&state.sql_query)).await;

    match outcome {
        Ok(Ok(rows)) => {
            state.context = format!(
                "query: {}\n\nresult: {}",
                state.sql_query,
                render_rows(&rows)
            );
            state.insert_metadata("row_count", rows.len());
            state.sql_result = rows;

            tracing::info!("Query returned {} rows", state.sql_result.len());
        }
        Ok(Err(e)) => {
            state.record_error(format!("Query execution failed: {}", e));
        }
        Err(_) => {
            state.record_error(format!(
                "Query execution timed out after {}s",
                call_timeout.as_secs()
            ));
        }
    }
}

/// Render result rows as a JSON array for the context summary.
fn render_rows(rows: &[Row]) -> String {
    let array = Value::Array(rows.iter().cloned().map(Value::Object).collect());
    array.to_string()
}
