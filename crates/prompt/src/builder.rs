//! Prompt builders for the built-in templates.
//!
//! Each builder renders one of the embedded templates with Handlebars and
//! returns the final prompt string ready for LLM execution.

use crate::templates::{CLASSIFY_TEMPLATE, SYNTHESIS_TEMPLATE, TEXT2SQL_TEMPLATE};
use handlebars::Handlebars;
use quarry_core::{AppError, AppResult};
use std::collections::HashMap;

/// Placeholder used in the synthesis prompt when no evidence was gathered.
pub const NO_CONTEXT_PLACEHOLDER: &str = "There is no available context";

/// Render a Handlebars template with variables.
pub fn render_template(template: &str, variables: &HashMap<String, String>) -> AppResult<String> {
    let mut handlebars = Handlebars::new();

    // Disable HTML escaping for plain text
    handlebars.register_escape_fn(handlebars::no_escape);

    handlebars
        .register_template_string("prompt", template)
        .map_err(|e| AppError::Prompt(format!("Failed to register template: {}", e)))?;

    let rendered = handlebars
        .render("prompt", &variables)
        .map_err(|e| AppError::Prompt(format!("Failed to render template: {}", e)))?;

    Ok(rendered)
}

/// Render an inventory of names as a comma-joined list, or "None" when empty.
fn render_inventory(items: &[String]) -> String {
    if items.is_empty() {
        "None".to_string()
    } else {
        items.join(", ")
    }
}

/// Build the classification prompt for a question and the current inventories.
pub fn classification_prompt(
    question: &str,
    tables: &[String],
    documents: &[String],
) -> AppResult<String> {
    tracing::debug!(
        "Building classification prompt ({} tables, {} documents)",
        tables.len(),
        documents.len()
    );

    let mut variables = HashMap::new();
    variables.insert("question".to_string(), question.to_string());
    variables.insert("tables".to_string(), render_inventory(tables));
    variables.insert("documents".to_string(), render_inventory(documents));

    render_template(CLASSIFY_TEMPLATE, &variables)
}

/// Build the text-to-SQL prompt for a question and a rendered schema description.
pub fn text2sql_prompt(question: &str, schema: &str) -> AppResult<String> {
    tracing::debug!("Building text-to-SQL prompt ({} schema bytes)", schema.len());

    let mut variables = HashMap::new();
    variables.insert("question".to_string(), question.to_string());
    variables.insert("schema".to_string(), schema.to_string());

    render_template(TEXT2SQL_TEMPLATE, &variables)
}

/// Build the synthesis prompt for a question and accumulated context.
///
/// An empty context is replaced by an explicit placeholder so the model is
/// told there is nothing to ground the answer in, rather than being handed
/// a silent gap.
pub fn synthesis_prompt(question: &str, context: &str) -> AppResult<String> {
    let effective_context = if context.trim().is_empty() {
        NO_CONTEXT_PLACEHOLDER
    } else {
        context
    };

    let mut variables = HashMap::new();
    variables.insert("question".to_string(), question.to_string());
    variables.insert("context".to_string(), effective_context.to_string());

    render_template(SYNTHESIS_TEMPLATE, &variables)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_simple_template() {
        let mut vars = HashMap::new();
        vars.insert("question".to_string(), "Hello, world!".to_string());

        let result = render_template("Question: {{question}}", &vars);
        assert!(result.is_ok());
        assert_eq!(result.unwrap(), "Question: Hello, world!");
    }

    #[test]
    fn test_classification_prompt_with_inventories() {
        let tables = vec!["customers".to_string(), "orders".to_string()];
        let documents = vec!["handbook.pdf".to_string()];

        let prompt =
            classification_prompt("How many customers are from London?", &tables, &documents)
                .unwrap();

        assert!(prompt.contains("customers, orders"));
        assert!(prompt.contains("handbook.pdf"));
        assert!(prompt.contains("How many customers are from London?"));
    }

    #[test]
    fn test_classification_prompt_empty_inventories() {
        let prompt = classification_prompt("Hello", &[], &[]).unwrap();

        assert!(prompt.contains("Available database tables: None"));
        assert!(prompt.contains("Available documents: None"));
    }

    #[test]
    fn test_text2sql_prompt() {
        let schema = "TABLE customers (id INTEGER, city TEXT)";
        let prompt = text2sql_prompt("Count customers from London", schema).unwrap();

        assert!(prompt.contains(schema));
        assert!(prompt.contains("Count customers from London"));
        assert!(prompt.contains("SQL query only"));
    }

    #[test]
    fn test_synthesis_prompt_with_context() {
        let prompt = synthesis_prompt("What is the leave policy?", "Employees get 25 days.")
            .unwrap();

        assert!(prompt.contains("Employees get 25 days."));
        assert!(!prompt.contains(NO_CONTEXT_PLACEHOLDER));
    }

    #[test]
    fn test_synthesis_prompt_empty_context() {
        let prompt = synthesis_prompt("Hello", "").unwrap();
        assert!(prompt.contains(NO_CONTEXT_PLACEHOLDER));

        let prompt = synthesis_prompt("Hello", "   \n").unwrap();
        assert!(prompt.contains(NO_CONTEXT_PLACEHOLDER));
    }

    #[test]
    fn test_no_escaping_of_special_characters() {
        let mut vars = HashMap::new();
        vars.insert(
            "question".to_string(),
            "Is revenue > 100 & growing?".to_string(),
        );

        let rendered = render_template("Q: {{question}}", &vars).unwrap();
        assert_eq!(rendered, "Q: Is revenue > 100 & growing?");
    }
}
