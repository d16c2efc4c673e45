//! Document store type definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Represents an ingested source document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentSource {
    /// Unique source identifier
    pub id: String,

    /// Display title (the sanitized file name, e.g. "handbook.md")
    pub title: String,

    /// Original path the document was ingested from
    pub path: String,

    /// Content type: "text", "markdown", "csv"
    pub content_type: String,

    /// When this source was indexed
    pub indexed_at: DateTime<Utc>,

    /// Number of chunks created from this source
    pub chunk_count: u32,

    /// Source size in bytes
    pub byte_count: u64,
}

/// A text chunk with embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentChunk {
    /// Unique chunk identifier
    pub id: String,

    /// Source document ID
    pub source_id: String,

    /// Title of the source document
    pub source_title: String,

    /// Position within source
    pub position: u32,

    /// Text content
    pub text: String,

    /// Embedding vector
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

/// Internal chunk candidate before embedding.
#[derive(Debug, Clone)]
pub struct ChunkCandidate {
    pub source_id: String,
    pub position: u32,
    pub text: String,
}

/// A single ranked result from a similarity search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    /// Snippet text
    pub content: String,

    /// Title of the source document the snippet came from
    pub source: String,

    /// Cosine similarity score
    pub score: f32,
}

/// Statistics for the document store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreStats {
    /// Number of indexed sources
    pub sources_count: u32,

    /// Number of indexed chunks
    pub chunks_count: u32,
}
