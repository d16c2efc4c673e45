//! SQLite-backed vector index for document chunks.

use crate::types::{DocumentChunk, DocumentSource};
use chrono::{DateTime, Utc};
use quarry_core::{AppError, AppResult};
use rusqlite::{params, params_from_iter, Connection, Row};
use std::path::Path;

/// Initialize the SQLite index database.
pub fn init_index(db_path: &Path) -> AppResult<Connection> {
    // Ensure parent directory exists
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| AppError::Knowledge(format!("Failed to create index directory: {}", e)))?;
    }

    let conn = Connection::open(db_path)
        .map_err(|e| AppError::Knowledge(format!("Failed to open SQLite index: {}", e)))?;

    // Create tables
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS sources (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL UNIQUE,
            path TEXT,
            content_type TEXT NOT NULL,
            indexed_at TEXT NOT NULL,
            chunk_count INTEGER NOT NULL,
            byte_count INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS chunks (
            id TEXT PRIMARY KEY,
            source_id TEXT NOT NULL,
            position INTEGER NOT NULL,
            text TEXT NOT NULL,
            embedding BLOB NOT NULL,
            FOREIGN KEY (source_id) REFERENCES sources(id)
        );

        CREATE INDEX IF NOT EXISTS idx_chunks_source ON chunks(source_id);
        "#,
    )
    .map_err(|e| AppError::Knowledge(format!("Failed to create tables: {}", e)))?;

    tracing::debug!("Initialized SQLite index at {:?}", db_path);
    Ok(conn)
}

/// Insert a source into the index.
pub fn insert_source(conn: &Connection, source: &DocumentSource) -> AppResult<()> {
    conn.execute(
        "INSERT OR REPLACE INTO sources (id, title, path, content_type, indexed_at, chunk_count, byte_count)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            source.id,
            source.title,
            source.path,
            source.content_type,
            source.indexed_at.to_rfc3339(),
            source.chunk_count as i64,
            source.byte_count as i64,
        ],
    )
    .map_err(|e| AppError::Knowledge(format!("Failed to insert source: {}", e)))?;

    Ok(())
}

/// Insert a chunk with embedding into the index.
pub fn insert_chunk(conn: &Connection, chunk: &DocumentChunk) -> AppResult<()> {
    let embedding_bytes = embedding_to_bytes(
        chunk
            .embedding
            .as_ref()
            .ok_or_else(|| AppError::Knowledge("Chunk missing embedding".to_string()))?,
    );

    conn.execute(
        "INSERT OR REPLACE INTO chunks (id, source_id, position, text, embedding)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            chunk.id,
            chunk.source_id,
            chunk.position as i64,
            chunk.text,
            embedding_bytes,
        ],
    )
    .map_err(|e| AppError::Knowledge(format!("Failed to insert chunk: {}", e)))?;

    Ok(())
}

fn row_to_chunk(row: &Row<'_>) -> rusqlite::Result<DocumentChunk> {
    let embedding_bytes: Vec<u8> = row.get(5)?;
    let embedding = bytes_to_embedding(&embedding_bytes)
        .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;

    Ok(DocumentChunk {
        id: row.get(0)?,
        source_id: row.get(1)?,
        source_title: row.get(2)?,
        position: row.get::<_, i64>(3)? as u32,
        text: row.get(4)?,
        embedding: Some(embedding),
    })
}

/// Query the index for the top-k chunks most similar to the query embedding.
///
/// When `title_filter` is non-empty, only chunks from sources whose title is
/// in the filter are considered.
pub fn query_chunks(
    conn: &Connection,
    query_embedding: &[f32],
    top_k: usize,
    title_filter: &[String],
) -> AppResult<Vec<(DocumentChunk, f32)>> {
    let base = "SELECT c.id, c.source_id, s.title, c.position, c.text, c.embedding
                FROM chunks c JOIN sources s ON s.id = c.source_id";

    let chunks: Vec<DocumentChunk> = if title_filter.is_empty() {
        let mut stmt = conn
            .prepare(base)
            .map_err(|e| AppError::Knowledge(format!("Failed to prepare query: {}", e)))?;

        let rows = stmt
            .query_map([], row_to_chunk)
            .map_err(|e| AppError::Knowledge(format!("Failed to query chunks: {}", e)))?;

        rows.filter_map(|r| r.ok()).collect()
    } else {
        let placeholders = vec!["?"; title_filter.len()].join(", ");
        let sql = format!("{} WHERE s.title IN ({})", base, placeholders);

        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| AppError::Knowledge(format!("Failed to prepare query: {}", e)))?;

        let rows = stmt
            .query_map(params_from_iter(title_filter.iter()), row_to_chunk)
            .map_err(|e| AppError::Knowledge(format!("Failed to query chunks: {}", e)))?;

        rows.filter_map(|r| r.ok()).collect()
    };

    let mut results: Vec<(DocumentChunk, f32)> = chunks
        .into_iter()
        .map(|chunk| {
            let score = chunk
                .embedding
                .as_ref()
                .map(|e| cosine_similarity(query_embedding, e))
                .unwrap_or(0.0);
            (chunk, score)
        })
        .collect();

    // Sort by score descending
    results.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    // Take top-k
    results.truncate(top_k);

    tracing::debug!(
        "Retrieved {} chunks (requested top-{})",
        results.len(),
        top_k
    );

    Ok(results)
}

/// Delete a source and its chunks by title.
///
/// Returns true if a source was removed.
pub fn delete_source(conn: &Connection, title: &str) -> AppResult<bool> {
    let source_id: Option<String> = conn
        .query_row(
            "SELECT id FROM sources WHERE title = ?1",
            params![title],
            |row| row.get(0),
        )
        .map(Some)
        .or_else(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => Ok(None),
            other => Err(AppError::Knowledge(format!(
                "Failed to look up source '{}': {}",
                title, other
            ))),
        })?;

    let Some(source_id) = source_id else {
        return Ok(false);
    };

    conn.execute("DELETE FROM chunks WHERE source_id = ?1", params![source_id])
        .map_err(|e| AppError::Knowledge(format!("Failed to delete chunks: {}", e)))?;

    conn.execute("DELETE FROM sources WHERE id = ?1", params![source_id])
        .map_err(|e| AppError::Knowledge(format!("Failed to delete source: {}", e)))?;

    tracing::info!("Removed document '{}' from index", title);
    Ok(true)
}

/// List all indexed sources, ordered by title.
pub fn list_sources(conn: &Connection) -> AppResult<Vec<DocumentSource>> {
    let mut stmt = conn
        .prepare(
            "SELECT id, title, path, content_type, indexed_at, chunk_count, byte_count
             FROM sources ORDER BY title",
        )
        .map_err(|e| AppError::Knowledge(format!("Failed to prepare query: {}", e)))?;

    let rows = stmt
        .query_map([], |row| {
            let indexed_at: String = row.get(4)?;
            Ok(DocumentSource {
                id: row.get(0)?,
                title: row.get(1)?,
                path: row.get(2)?,
                content_type: row.get(3)?,
                indexed_at: DateTime::parse_from_rfc3339(&indexed_at)
                    .map(|dt| dt.with_timezone(&Utc))
                    .unwrap_or_else(|_| Utc::now()),
                chunk_count: row.get::<_, i64>(5)? as u32,
                byte_count: row.get::<_, i64>(6)? as u64,
            })
        })
        .map_err(|e| AppError::Knowledge(format!("Failed to list sources: {}", e)))?;

    Ok(rows.filter_map(|r| r.ok()).collect())
}

/// Get (sources, chunks) counts for the index.
pub fn get_stats(conn: &Connection) -> AppResult<(u32, u32)> {
    let sources_count: u32 = conn
        .query_row("SELECT COUNT(*) FROM sources", [], |row| {
            row.get::<_, i64>(0).map(|v| v as u32)
        })
        .map_err(|e| AppError::Knowledge(format!("Failed to count sources: {}", e)))?;

    let chunks_count: u32 = conn
        .query_row("SELECT COUNT(*) FROM chunks", [], |row| {
            row.get::<_, i64>(0).map(|v| v as u32)
        })
        .map_err(|e| AppError::Knowledge(format!("Failed to count chunks: {}", e)))?;

    Ok((sources_count, chunks_count))
}

/// Convert embedding vector to bytes for storage.
fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(embedding.len() * 4);
    for &value in embedding {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Convert bytes back to embedding vector.
fn bytes_to_embedding(bytes: &[u8]) -> AppResult<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(AppError::Knowledge(
            "Invalid embedding bytes length".to_string(),
        ));
    }

    let mut embedding = Vec::with_capacity(bytes.len() / 4);
    for chunk in bytes.chunks_exact(4) {
        let value = f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        embedding.push(value);
    }

    Ok(embedding)
}

/// Calculate cosine similarity between two vectors.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::NamedTempFile;

    fn test_source(id: &str, title: &str) -> DocumentSource {
        DocumentSource {
            id: id.to_string(),
            title: title.to_string(),
            path: format!("/docs/{}", title),
            content_type: "text".to_string(),
            indexed_at: Utc::now(),
            chunk_count: 1,
            byte_count: 100,
        }
    }

    fn test_chunk(id: &str, source_id: &str, embedding: Vec<f32>) -> DocumentChunk {
        DocumentChunk {
            id: id.to_string(),
            source_id: source_id.to_string(),
            source_title: String::new(),
            position: 0,
            text: format!("chunk {}", id),
            embedding: Some(embedding),
        }
    }

    #[test]
    fn test_init_index() {
        let temp_file = NamedTempFile::new().unwrap();
        let conn = init_index(temp_file.path()).unwrap();

        let table_count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table'",
                [],
                |row| row.get(0),
            )
            .unwrap();

        assert!(table_count >= 2); // sources and chunks tables
    }

    #[test]
    fn test_insert_and_query() {
        let temp_file = NamedTempFile::new().unwrap();
        let conn = init_index(temp_file.path()).unwrap();

        insert_source(&conn, &test_source("s1", "a.txt")).unwrap();
        insert_chunk(&conn, &test_chunk("c1", "s1", vec![1.0, 0.0, 0.0])).unwrap();
        insert_chunk(&conn, &test_chunk("c2", "s1", vec![0.0, 1.0, 0.0])).unwrap();

        let results = query_chunks(&conn, &[1.0, 0.0, 0.0], 2, &[]).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0.id, "c1");
        assert!(results[0].1 > results[1].1);
        assert_eq!(results[0].0.source_title, "a.txt");
    }

    #[test]
    fn test_query_with_title_filter() {
        let temp_file = NamedTempFile::new().unwrap();
        let conn = init_index(temp_file.path()).unwrap();

        insert_source(&conn, &test_source("s1", "a.txt")).unwrap();
        insert_source(&conn, &test_source("s2", "b.txt")).unwrap();
        insert_chunk(&conn, &test_chunk("c1", "s1", vec![1.0, 0.0, 0.0])).unwrap();
        insert_chunk(&conn, &test_chunk("c2", "s2", vec![1.0, 0.0, 0.0])).unwrap();

        let filter = vec!["b.txt".to_string()];
        let results = query_chunks(&conn, &[1.0, 0.0, 0.0], 5, &filter).unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0.source_title, "b.txt");
    }

    #[test]
    fn test_query_filter_no_match() {
        let temp_file = NamedTempFile::new().unwrap();
        let conn = init_index(temp_file.path()).unwrap();

        insert_source(&conn, &test_source("s1", "a.txt")).unwrap();
        insert_chunk(&conn, &test_chunk("c1", "s1", vec![1.0, 0.0, 0.0])).unwrap();

        let filter = vec!["missing.txt".to_string()];
        let results = query_chunks(&conn, &[1.0, 0.0, 0.0], 5, &filter).unwrap();

        assert!(results.is_empty());
    }

    #[test]
    fn test_delete_source() {
        let temp_file = NamedTempFile::new().unwrap();
        let conn = init_index(temp_file.path()).unwrap();

        insert_source(&conn, &test_source("s1", "a.txt")).unwrap();
        insert_chunk(&conn, &test_chunk("c1", "s1", vec![1.0, 0.0])).unwrap();

        assert!(delete_source(&conn, "a.txt").unwrap());
        assert!(!delete_source(&conn, "a.txt").unwrap());

        let (sources, chunks) = get_stats(&conn).unwrap();
        assert_eq!(sources, 0);
        assert_eq!(chunks, 0);
    }

    #[test]
    fn test_list_sources_ordered() {
        let temp_file = NamedTempFile::new().unwrap();
        let conn = init_index(temp_file.path()).unwrap();

        insert_source(&conn, &test_source("s2", "b.txt")).unwrap();
        insert_source(&conn, &test_source("s1", "a.txt")).unwrap();

        let sources = list_sources(&conn).unwrap();
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].title, "a.txt");
        assert_eq!(sources[1].title, "b.txt");
    }

    #[test]
    fn test_embedding_roundtrip() {
        let embedding = vec![0.25, -1.5, 3.0];
        let bytes = embedding_to_bytes(&embedding);
        let restored = bytes_to_embedding(&bytes).unwrap();
        assert_eq!(embedding, restored);
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }
}
