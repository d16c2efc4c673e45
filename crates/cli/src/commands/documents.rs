//! Documents command handler.
//!
//! Manages the ingested document set: add, list, remove, and bulk sync of
//! the documents directory.

use clap::{Args, Subcommand};
use quarry_core::{config::AppConfig, AppError, AppResult};
use quarry_knowledge::{loader, DocumentStore};
use std::path::{Path, PathBuf};

/// Manage ingested documents
#[derive(Args, Debug)]
pub struct DocumentsCommand {
    #[command(subcommand)]
    pub action: DocumentsAction,
}

#[derive(Subcommand, Debug)]
pub enum DocumentsAction {
    /// Copy a document into the workspace and index it
    Add {
        /// Path to the document (TXT, MD, or CSV)
        path: PathBuf,
    },

    /// List indexed documents
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Remove a document from the index and the documents directory
    Remove {
        /// Document title as shown by `documents list`
        title: String,
    },

    /// Index every supported file in the documents directory
    Sync,
}

impl DocumentsCommand {
    /// Execute the documents command.
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let store = open_store(config)?;

        match &self.action {
            DocumentsAction::Add { path } => self.add(config, &store, path).await,
            DocumentsAction::List { json } => self.list(&store, *json).await,
            DocumentsAction::Remove { title } => self.remove(config, &store, title).await,
            DocumentsAction::Sync => self.sync(config, &store).await,
        }
    }

    async fn add(&self, config: &AppConfig, store: &DocumentStore, path: &Path) -> AppResult<()> {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| AppError::Config(format!("Not a file: {}", path.display())))?;

        if !loader::is_supported_document(&filename) {
            if loader::file_extension(&filename).as_deref() == Some("pdf") {
                return Err(AppError::Knowledge(format!(
                    "PDF extraction is not supported: {}. Convert the document to TXT, MD, or CSV first.",
                    filename
                )));
            }
            return Err(AppError::Knowledge(format!(
                "Unsupported file type: {}. Supported: TXT, MD, CSV",
                filename
            )));
        }

        // Copy into the documents directory under a sanitized name, then
        // index the copy; the original stays untouched
        let documents_dir = config.documents_path();
        std::fs::create_dir_all(&documents_dir).map_err(|e| {
            AppError::Config(format!("Failed to create documents directory: {}", e))
        })?;

        let target = documents_dir.join(loader::sanitize_filename(&filename));
        std::fs::copy(path, &target).map_err(|e| {
            AppError::Knowledge(format!("Failed to copy {}: {}", path.display(), e))
        })?;

        let source = store.add_document(&target).await?;

        println!(
            "Indexed '{}' ({} chunks, {} bytes)",
            source.title, source.chunk_count, source.byte_count
        );
        Ok(())
    }

    async fn list(&self, store: &DocumentStore, json: bool) -> AppResult<()> {
        let sources = store.list_sources().await?;

        if json {
            let output = serde_json::to_string_pretty(&sources)
                .map_err(|e| AppError::Serialization(e.to_string()))?;
            println!("{}", output);
            return Ok(());
        }

        if sources.is_empty() {
            println!("No documents indexed. Use 'quarry documents add <path>'.");
            return Ok(());
        }

        for source in sources {
            println!(
                "{}  ({}, {} chunks, {} bytes, indexed {})",
                source.title,
                source.content_type,
                source.chunk_count,
                source.byte_count,
                source.indexed_at.format("%Y-%m-%d %H:%M")
            );
        }
        Ok(())
    }

    async fn remove(
        &self,
        config: &AppConfig,
        store: &DocumentStore,
        title: &str,
    ) -> AppResult<()> {
        let removed = store.remove_document(title).await?;

        if !removed {
            return Err(AppError::Knowledge(format!(
                "No document titled '{}' in the index",
                title
            )));
        }

        // Also drop the stored copy if there is one
        let stored = config.documents_path().join(title);
        if stored.exists() {
            if let Err(e) = std::fs::remove_file(&stored) {
                tracing::warn!("Removed from index but could not delete {}: {}", stored.display(), e);
            }
        }

        println!("Removed '{}'", title);
        Ok(())
    }

    async fn sync(&self, config: &AppConfig, store: &DocumentStore) -> AppResult<()> {
        let dir = config.documents_path();
        let added = store.ingest_directory(&dir).await?;

        println!("Indexed {} documents from {}", added, dir.display());
        Ok(())
    }
}

/// Open the document store from configuration.
pub fn open_store(config: &AppConfig) -> AppResult<DocumentStore> {
    let embedder = quarry_knowledge::create_provider(
        "ollama",
        &config.endpoint,
        &config.embedding_model,
        config.embedding_dim as usize,
    )?;

    DocumentStore::open(
        &config.index_path(),
        embedder,
        config.chunk_size,
        config.chunk_overlap,
    )
}
