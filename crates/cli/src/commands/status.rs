//! Status command handler.
//!
//! Reports the health of the capability stack: LLM endpoint reachability,
//! database connectivity, and document index statistics.

use clap::Args;
use quarry_core::{config::AppConfig, AppError, AppResult};
use quarry_llm::{LlmClient, OllamaClient};
use quarry_sql::SqlEngine;

/// Show service health and index statistics
#[derive(Args, Debug)]
pub struct StatusCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl StatusCommand {
    /// Execute the status command.
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        // LLM endpoint
        let llm = OllamaClient::with_options(&config.endpoint, config.timeout_secs);
        let llm_status = match llm.health().await {
            Ok(()) => "ok".to_string(),
            Err(e) => format!("unavailable ({})", e),
        };

        // Database
        let engine = SqlEngine::open(config.database_path());
        let (db_status, table_count) = match engine.table_names() {
            Ok(tables) => ("ok".to_string(), tables.len()),
            Err(e) => (format!("unavailable ({})", e), 0),
        };

        // Document index
        let store = super::documents::open_store(config)?;
        let stats = store.stats().await?;

        if self.json {
            let output = serde_json::json!({
                "workspace": config.workspace.display().to_string(),
                "services": {
                    "llm": { "endpoint": config.endpoint, "model": config.model, "status": llm_status },
                    "database": { "path": config.database_path().display().to_string(), "status": db_status, "tables": table_count },
                    "documents": { "sources": stats.sources_count, "chunks": stats.chunks_count },
                }
            });

            let json = serde_json::to_string_pretty(&output)
                .map_err(|e| AppError::Serialization(e.to_string()))?;
            println!("{}", json);
            return Ok(());
        }

        println!("workspace:  {}", config.workspace.display());
        println!("llm:        {} ({}) - {}", config.endpoint, config.model, llm_status);
        println!(
            "database:   {} - {} ({} tables)",
            config.database_path().display(),
            db_status,
            table_count
        );
        println!(
            "documents:  {} indexed ({} chunks)",
            stats.sources_count, stats.chunks_count
        );

        Ok(())
    }
}
