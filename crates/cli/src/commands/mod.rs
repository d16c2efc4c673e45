//! Command handlers for the quarry CLI.
//!
//! This module organizes all CLI commands into separate submodules.

pub mod ask;
pub mod documents;
pub mod status;
pub mod tables;

// Re-export command types for convenience
pub use ask::AskCommand;
pub use documents::DocumentsCommand;
pub use status::StatusCommand;
pub use tables::TablesCommand;
