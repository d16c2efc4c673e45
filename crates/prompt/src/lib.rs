//! Prompt system for quarry.
//!
//! Provides the built-in Handlebars templates (classification, text-to-SQL,
//! answer synthesis) and builders that render them with request data.

pub mod builder;
pub mod templates;

// Re-export the builders
pub use builder::{
    classification_prompt, render_template, synthesis_prompt, text2sql_prompt,
    NO_CONTEXT_PLACEHOLDER,
};
