//! Redraft CLI
//!
//! Main entry point for the redraft command-line tool.
//! Splits a document into chunks and rewrites a selection of them with an LLM.

mod commands;

use clap::{Parser, Subcommand};
use commands::{ChunksCommand, PromptsCommand, RewriteCommand};
use redraft_core::{config::AppConfig, logging, AppResult};
use std::path::PathBuf;

/// Redraft - rewrite large documents chunk by chunk
#[derive(Parser, Debug)]
#[command(name = "redraft")]
#[command(about = "Rewrite large documents chunk by chunk with an LLM", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "REDRAFT_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "REDRAFT_CONFIG")]
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

    /// LLM provider (ollama, openai, claude, mock)
    #[arg(short, long, global = true, env = "REDRAFT_PROVIDER")]
    provider: Option<String>,

    /// Model identifier
    #[arg(short, long, global = true, env = "REDRAFT_MODEL")]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Split a document into chunks and list them
    Chunks(ChunksCommand),

    /// Rewrite selected chunks of a document under one instruction
    Rewrite(RewriteCommand),

    /// List available rewrite prompts
    Prompts(PromptsCommand),
}

#[tokio::main]
async fn main() -> AppResult<()> {
    // Parse command-line arguments first (needed for logging config)
    let cli = Cli::parse();

    // Load base configuration from environment and config file
    let mut config = AppConfig::load()?;

    // A config file located by a flag is merged before the flag overrides
    let flagged_config = cli.config.clone().or_else(|| {
        cli.workspace
            .as_ref()
            .map(|workspace| workspace.join(".redraft").join("config.yaml"))
    });
    if let Some(path) = flagged_config.filter(|path| path.exists()) {
        config = config.merge_yaml(&path)?;
    }

    // Apply CLI overrides
    let config = config.with_overrides(
        cli.workspace,
        cli.config,
        cli.provider,
        cli.model,
        cli.log_level,
        cli.verbose,
        cli.no_color,
    );

    // Initialize logging with final configuration
    logging::init_logging(config.log_level.as_deref(), config.no_color)?;

    tracing::info!("Redraft CLI starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Provider: {}", config.provider);
    tracing::debug!("Model: {}", config.model);

    let command_name = match &cli.command {
        Commands::Chunks(_) => "chunks",
        Commands::Rewrite(_) => "rewrite",
        Commands::Prompts(_) => "prompts",
    };
    let _span = tracing::info_span!("command", name = command_name).entered();

    // Route to command handlers
    let result = match cli.command {
        Commands::Chunks(cmd) => cmd.execute(&config).await,
        Commands::Rewrite(cmd) => cmd.execute(&config).await,
        Commands::Prompts(cmd) => cmd.execute(&config).await,
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}
