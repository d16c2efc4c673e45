//! Built-in prompt templates.
//!
//! quarry ships three fixed prompts: question classification, text-to-SQL
//! generation, and answer synthesis. They are embedded rather than loaded
//! from disk since none of them is user-editable.

/// Template for classifying a question into sql / document / general.
pub const CLASSIFY_TEMPLATE: &str = r#"You classify a user question into exactly one of three categories:
- "sql" for questions answerable by querying the database tables listed below
- "document" for questions about the content of the listed documents
- "general" for everything else

Available database tables: {{tables}}
Available documents: {{documents}}

Question: {{question}}

Respond with a single JSON object and nothing else, in this exact shape:
{"query_type": "<sql|document|general>", "confidence": <number between 0 and 1>, "reasoning": "<brief explanation>"}
"#;

/// Template for converting a natural language question to a SQLite query.
pub const TEXT2SQL_TEMPLATE: &str = r#"Convert the natural language question into a single SQLite query.

Database schema:
{{schema}}

Question: {{question}}

Respond with the SQL query only, no explanation.
"#;

/// Template for synthesizing the final answer from gathered evidence.
pub const SYNTHESIS_TEMPLATE: &str = r#"Answer the user question from the context below without adding any explanation, make it a direct answer.
If you can't answer from the context, say you don't have information to answer this question.

## Context:
{{context}}

## Question:
{{question}}

## Answer:
"#;
