//! Natural-language-to-SQL generation.
//!
//! Renders the text-to-SQL prompt with the (allow-list-filtered) schema
//! description and asks the LLM for a query. Model output is cleaned of
//! code fences before being handed to the engine.

use quarry_core::AppResult;
use quarry_llm::{GenerateRequest, LlmClient};
use quarry_prompt::text2sql_prompt;
use std::sync::Arc;

/// Maximum tokens for a generated query.
const MAX_QUERY_TOKENS: u32 = 512;

/// Generates SQL queries from natural language questions.
pub struct SqlGenerator {
    client: Arc<dyn LlmClient>,
    model: String,
}

impl SqlGenerator {
    /// Create a generator bound to an LLM client and model.
    pub fn new(client: Arc<dyn LlmClient>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }

    /// Generate a SQL query for the question against the given schema.
    ///
    /// Returns the cleaned query text; may be empty if the model produced
    /// nothing usable (callers must treat an empty query as a generation
    /// failure and never execute it).
    pub async fn generate_query(&self, question: &str, schema: &str) -> AppResult<String> {
        let prompt = text2sql_prompt(question, schema)?;

        let request = GenerateRequest::new(prompt, &self.model)
            .with_temperature(0.0)
            .with_max_tokens(MAX_QUERY_TOKENS);

        let response = self.client.complete(&request).await?;
        let query = strip_code_fences(&response.content);

        tracing::debug!("Generated SQL: {}", query);
        Ok(query)
    }
}

/// Strip a surrounding Markdown code fence (with optional language tag)
/// from model output.
pub fn strip_code_fences(text: &str) -> String {
    let trimmed = text.trim();

    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed.to_string();
    };

    // Drop the language tag line ("sql", "sqlite", ...) if present
    let body = match rest.split_once('\n') {
        Some((_, body)) => body,
        None => rest,
    };

    let body = body.rsplit_once("```").map(|(b, _)| b).unwrap_or(body);
    body.trim().to_string()
}
