//! Document knowledge system for quarry.
//!
//! Provides document ingestion (load, chunk, embed) and similarity search
//! over a SQLite-backed vector index. The `DocumentStore` facade is the
//! entry point; it is safe to share across concurrent pipeline invocations.

pub mod chunker;
pub mod embeddings;
pub mod index;
pub mod loader;
pub mod store;
pub mod types;

// Re-export the main entry points
pub use embeddings::{create_provider, EmbeddingProvider, MockEmbedder, OllamaEmbedder};
pub use store::DocumentStore;
pub use types::{DocumentChunk, DocumentSource, SearchHit, StoreStats};
