//! The two evidence-gathering branches.
//!
//! Exactly one of these runs per request (or neither, for general
//! questions). Branches communicate failure only through `state.error`;
//! nothing is raised past the branch boundary.

pub mod document;
pub mod sql;

pub use document::{retrieve_stage, NO_EVIDENCE_MARKER};
pub use sql::execute_sql_stage;
