//! Configuration management for quarry.
//!
//! This module handles loading and merging configuration from multiple sources:
//! - Environment variables
//! - Command-line flags
//! - Config files (.quarry/config.yaml)
//!
//! The configuration is workspace-centric, with runtime state (vector index,
//! default database) stored under `.quarry/`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{AppError, AppResult};

/// Main application configuration.
///
/// This struct holds all global configuration options that affect
/// behavior across commands and pipeline invocations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .quarry/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Ollama endpoint URL
    pub endpoint: String,

    /// Default generation model identifier
    pub model: String,

    /// Embedding model identifier
    pub embedding_model: String,

    /// Embedding vector dimension
    pub embedding_dim: u32,

    /// Path to the queryable SQLite database (None = .quarry/data.db)
    pub database: Option<PathBuf>,

    /// Directory holding ingested documents (None = <workspace>/documents)
    pub documents_dir: Option<PathBuf>,

    /// Number of snippets retrieved per document search
    pub top_k: u32,

    /// Chunk size in characters for document splitting
    pub chunk_size: usize,

    /// Overlap in characters between consecutive chunks
    pub chunk_overlap: usize,

    /// Per-call timeout for external capability calls, in seconds
    pub timeout_secs: u64,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,
}

/// Full configuration file structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ConfigFile {
    llm: Option<LlmSection>,
    database: Option<DatabaseSection>,
    documents: Option<DocumentsSection>,
    retrieval: Option<RetrievalSection>,
    workspace: Option<WorkspaceSection>,
    logging: Option<LoggingSection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LlmSection {
    endpoint: Option<String>,
    model: Option<String>,
    #[serde(rename = "embeddingModel")]
    embedding_model: Option<String>,
    #[serde(rename = "embeddingDim")]
    embedding_dim: Option<u32>,
    #[serde(rename = "timeoutSecs")]
    timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DatabaseSection {
    path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DocumentsSection {
    dir: Option<String>,
    #[serde(rename = "chunkSize")]
    chunk_size: Option<usize>,
    #[serde(rename = "chunkOverlap")]
    chunk_overlap: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RetrievalSection {
    #[serde(rename = "topK")]
    top_k: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WorkspaceSection {
    path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingSection {
    level: Option<String>,
    color: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            endpoint: "http://localhost:11434".to_string(), // Local-first default
            model: "llama3.1:8b".to_string(),
            embedding_model: "nomic-embed-text".to_string(),
            embedding_dim: 768,
            database: None,
            documents_dir: None,
            top_k: 4,
            chunk_size: 1000,
            chunk_overlap: 200,
            timeout_secs: 60,
            log_level: None,
            verbose: false,
            no_color: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables and defaults.
    ///
    /// Environment variables:
    /// - `QUARRY_WORKSPACE`: Override workspace path
    /// - `QUARRY_CONFIG`: Path to config file
    /// - `QUARRY_ENDPOINT`: Ollama endpoint URL
    /// - `QUARRY_MODEL`: Generation model identifier
    /// - `QUARRY_DATABASE`: Path to the queryable SQLite database
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    pub fn load() -> AppResult<Self> {
        let mut config = Self::default();

        // Load from environment variables
        if let Ok(workspace) = std::env::var("QUARRY_WORKSPACE") {
            config.workspace = PathBuf::from(workspace);
        }

        if let Ok(config_file) = std::env::var("QUARRY_CONFIG") {
            config.config_file = Some(PathBuf::from(config_file));
        }

        // Validate workspace exists
        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        // Load from YAML config file if it exists
        let config_path = if let Some(ref cf) = config.config_file {
            cf.clone()
        } else {
            config.workspace.join(".quarry/config.yaml")
        };

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        }

        // Environment variables override YAML config
        if let Ok(endpoint) = std::env::var("QUARRY_ENDPOINT") {
            config.endpoint = endpoint;
        }

        if let Ok(model) = std::env::var("QUARRY_MODEL") {
            config.model = model;
        }

        if let Ok(database) = std::env::var("QUARRY_DATABASE") {
            config.database = Some(PathBuf::from(database));
        }

        config.log_level = std::env::var("RUST_LOG").ok();

        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Merge YAML configuration file into this config.
    fn merge_yaml(&mut self, path: &PathBuf) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config_file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        let mut result = self.clone();

        // Merge workspace settings
        if let Some(ws) = config_file.workspace {
            if let Some(path) = ws.path {
                result.workspace = PathBuf::from(path);
            }
        }

        // Merge logging settings
        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
        }

        // Merge LLM settings
        if let Some(llm) = config_file.llm {
            if let Some(endpoint) = llm.endpoint {
                result.endpoint = endpoint;
            }
            if let Some(model) = llm.model {
                result.model = model;
            }
            if let Some(embedding_model) = llm.embedding_model {
                result.embedding_model = embedding_model;
            }
            if let Some(embedding_dim) = llm.embedding_dim {
                result.embedding_dim = embedding_dim;
            }
            if let Some(timeout_secs) = llm.timeout_secs {
                result.timeout_secs = timeout_secs;
            }
        }

        // Merge database settings
        if let Some(database) = config_file.database {
            if let Some(path) = database.path {
                result.database = Some(PathBuf::from(path));
            }
        }

        // Merge document settings
        if let Some(documents) = config_file.documents {
            if let Some(dir) = documents.dir {
                result.documents_dir = Some(PathBuf::from(dir));
            }
            if let Some(chunk_size) = documents.chunk_size {
                result.chunk_size = chunk_size;
            }
            if let Some(chunk_overlap) = documents.chunk_overlap {
                result.chunk_overlap = chunk_overlap;
            }
        }

        // Merge retrieval settings
        if let Some(retrieval) = config_file.retrieval {
            if let Some(top_k) = retrieval.top_k {
                result.top_k = top_k;
            }
        }

        Ok(result)
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// This method merges command-line flags with the loaded configuration,
    /// giving precedence to CLI flags over environment variables.
    #[allow(clippy::too_many_arguments)]
    pub fn with_overrides(
        mut self,
        workspace: Option<PathBuf>,
        config_file: Option<PathBuf>,
        model: Option<String>,
        endpoint: Option<String>,
        database: Option<PathBuf>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(workspace) = workspace {
            self.workspace = workspace;
        }

        if let Some(config_file) = config_file {
            self.config_file = Some(config_file);
        }

        if let Some(model) = model {
            self.model = model;
        }

        if let Some(endpoint) = endpoint {
            self.endpoint = endpoint;
        }

        if let Some(database) = database {
            self.database = Some(database);
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            // Verbose mode implies debug logging
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Get the path to the .quarry directory.
    pub fn quarry_dir(&self) -> PathBuf {
        self.workspace.join(".quarry")
    }

    /// Ensure the .quarry directory exists.
    pub fn ensure_quarry_dir(&self) -> AppResult<()> {
        let quarry_dir = self.quarry_dir();
        if !quarry_dir.exists() {
            std::fs::create_dir_all(&quarry_dir).map_err(|e| {
                AppError::Config(format!("Failed to create .quarry directory: {}", e))
            })?;
        }
        Ok(())
    }

    /// Path to the SQLite vector index.
    pub fn index_path(&self) -> PathBuf {
        self.quarry_dir().join("index.db")
    }

    /// Path to the queryable SQLite database.
    ///
    /// Relative paths are resolved against the workspace.
    pub fn database_path(&self) -> PathBuf {
        match &self.database {
            Some(path) if path.is_absolute() => path.clone(),
            Some(path) => self.workspace.join(path),
            None => self.quarry_dir().join("data.db"),
        }
    }

    /// Path to the documents directory.
    ///
    /// Relative paths are resolved against the workspace.
    pub fn documents_path(&self) -> PathBuf {
        match &self.documents_dir {
            Some(dir) if dir.is_absolute() => dir.clone(),
            Some(dir) => self.workspace.join(dir),
            None => self.workspace.join("documents"),
        }
    }

    /// Validate configuration values.
    pub fn validate(&self) -> AppResult<()> {
        if self.endpoint.trim().is_empty() {
            return Err(AppError::Config("LLM endpoint must not be empty".to_string()));
        }

        if self.model.trim().is_empty() {
            return Err(AppError::Config("Model identifier must not be empty".to_string()));
        }

        if self.chunk_size == 0 {
            return Err(AppError::Config("Chunk size must be greater than zero".to_string()));
        }

        if self.chunk_overlap >= self.chunk_size {
            return Err(AppError::Config(format!(
                "Chunk overlap ({}) must be smaller than chunk size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }

        if self.top_k == 0 {
            return Err(AppError::Config(
                "Retrieval top-k must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}
