//! Pigeon CLI
//!
//! Main entry point for the pigeon command-line tool.
//! Answers support email from an FAQ corpus and tracks the resulting threads.

mod commands;

use clap::{Parser, Subcommand};
use commands::{
    AskCommand, DocumentsCommand, IngestCommand, PromptsCommand, RegenCommand, ReplyCommand,
    ResponseCommand, ThreadsCommand,
};
use pigeon_core::{config::AppConfig, logging, AppResult};
use std::path::PathBuf;

/// Pigeon - grounded drafts for support email
#[derive(Parser, Debug)]
#[command(name = "pigeon")]
#[command(about = "Grounded reply drafts for support email", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "PIGEON_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "PIGEON_CONFIG")]
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

    /// Completion provider (ollama, openai)
    #[arg(short, long, global = true, env = "PIGEON_PROVIDER")]
    provider: Option<String>,

    /// Completion model identifier
    #[arg(short, long, global = true, env = "PIGEON_MODEL")]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ingest inbound emails and draft responses
    Ingest(IngestCommand),

    /// Regenerate a thread's drafted response
    Regen(RegenCommand),

    /// Show the drafted response for an email
    Response(ResponseCommand),

    /// Record a sent reply and resolve the thread
    Reply(ReplyCommand),

    /// Thread triage
    Threads(ThreadsCommand),

    /// FAQ corpus management
    Documents(DocumentsCommand),

    /// Draft a reply without storing it
    Ask(AskCommand),

    /// List the prompts in effect
    Prompts(PromptsCommand),
}

#[tokio::main]
async fn main() -> AppResult<()> {
    // Parse command-line arguments first (needed for logging config)
    let cli = Cli::parse();

    // Load base configuration from environment
    let config = AppConfig::load()?;

    // Apply CLI overrides, then re-read the file in case the workspace moved
    let config = config
        .with_overrides(
            cli.workspace,
            cli.config,
            cli.provider,
            cli.model,
            cli.log_level,
            cli.verbose,
            cli.no_color,
        )
        .reload_file()?;

    // Initialize logging with final configuration
    logging::init_logging(config.log_level.as_deref(), config.no_color, config.log_format)?;

    tracing::info!("Pigeon CLI starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Provider: {}", config.provider);
    tracing::debug!("Model: {}", config.model);

    config.ensure_state_dir()?;

    let command_name = match &cli.command {
        Commands::Ingest(_) => "ingest",
        Commands::Regen(_) => "regen",
        Commands::Response(_) => "response",
        Commands::Reply(_) => "reply",
        Commands::Threads(_) => "threads",
        Commands::Documents(_) => "documents",
        Commands::Ask(_) => "ask",
        Commands::Prompts(_) => "prompts",
    };
    let _span = tracing::info_span!("command", name = command_name).entered();

    let result = match cli.command {
        Commands::Ingest(cmd) => cmd.execute(&config).await,
        Commands::Regen(cmd) => cmd.execute(&config).await,
        Commands::Response(cmd) => cmd.execute(&config).await,
        Commands::Reply(cmd) => cmd.execute(&config).await,
        Commands::Threads(cmd) => cmd.execute(&config).await,
        Commands::Documents(cmd) => cmd.execute(&config).await,
        Commands::Ask(cmd) => cmd.execute(&config).await,
        Commands::Prompts(cmd) => cmd.execute(&config).await,
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}
