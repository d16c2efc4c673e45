//! Embedding generation for document chunks and queries.

pub mod provider;
pub mod providers;

pub use provider::{create_provider, EmbeddingProvider};
pub use providers::{MockEmbedder, OllamaEmbedder};
