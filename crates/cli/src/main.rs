//! quarry CLI
//!
//! Main entry point for the quarry command-line tool. Routes questions to
//! document retrieval, SQL execution, or general knowledge, and manages the
//! document index and database inspection.

mod commands;

use clap::{Parser, Subcommand};
use commands::{AskCommand, DocumentsCommand, StatusCommand, TablesCommand};
use quarry_core::{config::AppConfig, logging, AppResult};
use std::path::PathBuf;

/// quarry - local question answering over documents and SQL
#[derive(Parser, Debug)]
#[command(name = "quarry")]
#[command(about = "Local question answering over documents and SQL", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "QUARRY_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "QUARRY_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    /// Model identifier (e.g., "llama3.1:8b")
    #[arg(short, long, global = true, env = "QUARRY_MODEL")]
    model: Option<String>,

    /// Ollama endpoint URL
    #[arg(short, long, global = true, env = "QUARRY_ENDPOINT")]
    endpoint: Option<String>,

    /// Path to the queryable SQLite database
    #[arg(short, long, global = true, env = "QUARRY_DATABASE")]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ask a question; quarry decides whether to search documents,
    /// query the database, or answer directly
    Ask(AskCommand),

    /// Manage ingested documents
    Documents(DocumentsCommand),

    /// List the queryable database tables
    Tables(TablesCommand),

    /// Show service health and index statistics
    Status(StatusCommand),
}

#[tokio::main]
async fn main() -> AppResult<()> {
    // Parse command-line arguments first (needed for logging config)
    let cli = Cli::parse();

    // Load base configuration from environment
    let config = AppConfig::load()?;

    // Apply CLI overrides
    let config = config.with_overrides(
        cli.workspace,
        cli.config,
        cli.model,
        cli.endpoint,
        cli.database,
        cli.log_level,
        cli.verbose,
        cli.no_color,
    );

    // Initialize logging with final configuration
    logging::init_logging(config.log_level.as_deref(), config.no_color)?;

    // Log startup
    tracing::info!("quarry starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Endpoint: {}", config.endpoint);
    tracing::debug!("Model: {}", config.model);

    config.validate()?;

    // Ensure .quarry directory exists
    config.ensure_quarry_dir()?;

    let command_name = match &cli.command {
        Commands::Ask(_) => "ask",
        Commands::Documents(_) => "documents",
        Commands::Tables(_) => "tables",
        Commands::Status(_) => "status",
    };
    let _span = tracing::info_span!("command", name = command_name).entered();

    // Route to command handlers
    let result = match cli.command {
        Commands::Ask(cmd) => cmd.execute(&config).await,
        Commands::Documents(cmd) => cmd.execute(&config).await,
        Commands::Tables(cmd) => cmd.execute(&config).await,
        Commands::Status(cmd) => cmd.execute(&config).await,
    };

    // Log completion
    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}
