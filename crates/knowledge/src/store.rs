//! Document store facade.
//!
//! Combines the loader, chunker, embedding provider, and SQLite vector index
//! behind one handle that is safe to share across concurrent pipeline
//! invocations. A single async mutex guards the index connection: document
//! mutation (add/remove) can never interleave with an in-flight search, which
//! keeps every retrieval on a consistent index snapshot.

use crate::chunker::chunk_text;
use crate::embeddings::EmbeddingProvider;
use crate::loader;
use crate::types::{DocumentChunk, DocumentSource, SearchHit, StoreStats};
use crate::index;
use chrono::Utc;
use quarry_core::{AppError, AppResult};
use rusqlite::Connection;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Shared handle over the document index and its embedding provider.
pub struct DocumentStore {
    index: Mutex<Connection>,
    embedder: Arc<dyn EmbeddingProvider>,
    chunk_size: usize,
    chunk_overlap: usize,
}

impl DocumentStore {
    /// Open (or create) the document store at the given index path.
    pub fn open(
        index_path: &Path,
        embedder: Arc<dyn EmbeddingProvider>,
        chunk_size: usize,
        chunk_overlap: usize,
    ) -> AppResult<Self> {
        let conn = index::init_index(index_path)?;

        Ok(Self {
            index: Mutex::new(conn),
            embedder,
            chunk_size,
            chunk_overlap,
        })
    }

    /// Ingest a single document: load, chunk, embed, and index it.
    ///
    /// Re-ingesting a document with the same title replaces the previous
    /// version.
    pub async fn add_document(&self, path: &Path) -> AppResult<DocumentSource> {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        let title = loader::sanitize_filename(&filename);
        if title.is_empty() {
            return Err(AppError::Knowledge(format!(
                "Cannot derive a document title from {}",
                path.display()
            )));
        }

        let text = loader::load_text(path)?;
        let byte_count = text.len() as u64;

        let source_id = Uuid::new_v4().to_string();
        let mut candidates = chunk_text(&source_id, &text, self.chunk_size, self.chunk_overlap);

        // Short documents can fall below the chunker's minimum-size cutoff;
        // index them as a single chunk instead of dropping them.
        if candidates.is_empty() && !text.trim().is_empty() {
            candidates = vec![crate::types::ChunkCandidate {
                source_id: source_id.clone(),
                position: 0,
                text: text.trim().to_string(),
            }];
        }

        if candidates.is_empty() {
            return Err(AppError::Knowledge(format!(
                "Document '{}' contains no indexable text",
                title
            )));
        }

        // Embed before taking the index lock; only the index mutation itself
        // needs to be serialized against searches.
        let texts: Vec<String> = candidates.iter().map(|c| c.text.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;

        let source = DocumentSource {
            id: source_id.clone(),
            title: title.clone(),
            path: path.display().to_string(),
            content_type: loader::file_extension(&filename)
                .map(|ext| loader::content_type(&ext).to_string())
                .unwrap_or_else(|| "text".to_string()),
            indexed_at: Utc::now(),
            chunk_count: candidates.len() as u32,
            byte_count,
        };

        let conn = self.index.lock().await;

        // Replace any previous version of this document
        index::delete_source(&conn, &title)?;
        index::insert_source(&conn, &source)?;

        for (candidate, embedding) in candidates.iter().zip(embeddings) {
            let chunk = DocumentChunk {
                id: Uuid::new_v4().to_string(),
                source_id: source_id.clone(),
                source_title: title.clone(),
                position: candidate.position,
                text: candidate.text.clone(),
                embedding: Some(embedding),
            };
            index::insert_chunk(&conn, &chunk)?;
        }

        tracing::info!(
            "Indexed document '{}' ({} chunks, {} bytes)",
            title,
            source.chunk_count,
            source.byte_count
        );

        Ok(source)
    }

    /// Ingest every supported document in a directory (non-recursive).
    ///
    /// Individual file failures are logged and skipped so one bad file
    /// cannot block the rest of the corpus.
    pub async fn ingest_directory(&self, dir: &Path) -> AppResult<u32> {
        if !dir.exists() {
            tracing::warn!("Documents directory does not exist: {}", dir.display());
            return Ok(0);
        }

        let mut added = 0u32;

        for entry in walkdir::WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            if !entry.file_type().is_file() {
                continue;
            }

            let name = entry.file_name().to_string_lossy().to_string();
            if !loader::is_supported_document(&name) {
                continue;
            }

            match self.add_document(entry.path()).await {
                Ok(_) => added += 1,
                Err(e) => {
                    tracing::error!("Failed to ingest {}: {}", entry.path().display(), e);
                }
            }
        }

        tracing::info!("Ingested {} documents from {}", added, dir.display());
        Ok(added)
    }

    /// Remove a document by title. Returns true if a document was removed.
    pub async fn remove_document(&self, title: &str) -> AppResult<bool> {
        let conn = self.index.lock().await;
        index::delete_source(&conn, title)
    }

    /// Similarity search over the indexed chunks.
    ///
    /// When `file_filter` is non-empty, only chunks from the listed document
    /// titles are considered.
    pub async fn search(
        &self,
        query: &str,
        k: usize,
        file_filter: &[String],
    ) -> AppResult<Vec<SearchHit>> {
        let query_embedding = self.embedder.embed(query).await?;

        let conn = self.index.lock().await;
        let results = index::query_chunks(&conn, &query_embedding, k, file_filter)?;

        Ok(results
            .into_iter()
            .map(|(chunk, score)| SearchHit {
                content: chunk.text,
                source: chunk.source_title,
                score,
            })
            .collect())
    }

    /// List all indexed documents.
    pub async fn list_sources(&self) -> AppResult<Vec<DocumentSource>> {
        let conn = self.index.lock().await;
        index::list_sources(&conn)
    }

    /// List the titles of all indexed documents.
    pub async fn titles(&self) -> AppResult<Vec<String>> {
        Ok(self
            .list_sources()
            .await?
            .into_iter()
            .map(|s| s.title)
            .collect())
    }

    /// Index statistics.
    pub async fn stats(&self) -> AppResult<StoreStats> {
        let conn = self.index.lock().await;
        let (sources_count, chunks_count) = index::get_stats(&conn)?;
        Ok(StoreStats {
            sources_count,
            chunks_count,
        })
    }
}
