//! SQL capability for quarry.
//!
//! Provides the SQLite engine (schema introspection, query execution) and
//! the natural-language-to-SQL generator used by the pipeline's SQL branch.

pub mod engine;
pub mod generate;

// Re-export the main entry points
pub use engine::{SqlEngine, SqlRow};
pub use generate::{strip_code_fences, SqlGenerator};
