//! Tables command handler.
//!
//! Lists the tables of the queryable database, with their columns.

use clap::Args;
use quarry_core::{config::AppConfig, AppError, AppResult};
use quarry_sql::SqlEngine;

/// List the queryable database tables
#[derive(Args, Debug)]
pub struct TablesCommand {
    /// Show column details for each table
    #[arg(long)]
    pub schema: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl TablesCommand {
    /// Execute the tables command.
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let engine = SqlEngine::open(config.database_path());
        let tables = engine.table_names()?;

        if self.json {
            let output = serde_json::to_string_pretty(&tables)
                .map_err(|e| AppError::Serialization(e.to_string()))?;
            println!("{}", output);
            return Ok(());
        }

        if tables.is_empty() {
            println!(
                "No tables found in {}",
                config.database_path().display()
            );
            return Ok(());
        }

        if self.schema {
            println!("{}", engine.render_schema(&[])?);
        } else {
            for table in tables {
                println!("{}", table);
            }
        }

        Ok(())
    }
}
