//! crimestat CLI
//!
//! Main entry point for the crimestat command-line tool.
//! Answers questions about municipal crime data with retrieval-grounded chat.

mod chatbot;
mod commands;

use clap::{Parser, Subcommand};
use commands::{ChatCommand, ContextCommand, SearchCommand, SummaryCommand};
use crimestat_core::{config::AppConfig, logging, AppResult};
use std::path::PathBuf;

/// crimestat - chat over municipal crime statistics and predictions
#[derive(Parser, Debug)]
#[command(name = "crimestat")]
#[command(about = "Chat over municipal crime statistics and predictions", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "CRIMESTAT_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "CRIMESTAT_CONFIG")]
    config: Option<PathBuf>,

    /// Directory holding historicos.csv and predicciones.csv
    #[arg(long, global = true, env = "CRIMESTAT_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    /// LLM provider (groq, openai, ollama)
    #[arg(short, long, global = true, env = "CRIMESTAT_PROVIDER")]
    provider: Option<String>,

    /// Model identifier
    #[arg(short, long, global = true, env = "CRIMESTAT_MODEL")]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Chat with the assistant
    Chat(ChatCommand),

    /// Show the retrieved data context for a query
    Context(ContextCommand),

    /// Search the indexed municipality summaries
    Search(SearchCommand),

    /// Show what data is loaded
    Summary(SummaryCommand),
}

#[tokio::main]
async fn main() -> AppResult<()> {
    let cli = Cli::parse();

    let config = AppConfig::load()?.with_overrides(
        cli.workspace,
        cli.config,
        cli.data_dir,
        cli.provider,
        cli.model,
        cli.log_level,
        cli.verbose,
        cli.no_color,
    );

    logging::init_logging(config.log_level.as_deref(), config.no_color)?;

    tracing::info!("crimestat starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Data dir: {:?}", config.data_dir);
    tracing::debug!("Provider: {}", config.provider);
    tracing::debug!("Model: {}", config.model);

    config.validate()?;
    config.ensure_state_dir()?;

    let command_name = match &cli.command {
        Commands::Chat(_) => "chat",
        Commands::Context(_) => "context",
        Commands::Search(_) => "search",
        Commands::Summary(_) => "summary",
    };
    let _span = tracing::info_span!("command", name = command_name).entered();

    let result = match cli.command {
        Commands::Chat(cmd) => cmd.execute(&config).await,
        Commands::Context(cmd) => cmd.execute(&config).await,
        Commands::Search(cmd) => cmd.execute(&config).await,
        Commands::Summary(cmd) => cmd.execute(&config).await,
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}
