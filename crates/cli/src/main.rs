//! vecgate CLI
//!
//! Main entry point for the vecgate binary.
//! Runs the HTTP gateway and exposes the same document operations locally.

mod commands;
mod server;

use clap::{Parser, Subcommand};
use commands::{
    AddCommand, DeleteCommand, GetCommand, HealthCommand, IndexCommand, SearchCommand,
    ServeCommand,
};
use std::path::PathBuf;
use vecgate_core::{config::AppConfig, logging, AppResult};

/// vecgate - semantic document gateway over a vector index
#[derive(Parser, Debug)]
#[command(name = "vecgate")]
#[command(about = "Semantic document gateway over a vector index", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, env = "VECGATE_CONFIG")]
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

    /// Vector store location (directory or URI)
    #[arg(long, global = true, env = "STORE_URI")]
    store_uri: Option<String>,

    /// Collection (table) name
    #[arg(long, global = true, env = "STORE_COLLECTION")]
    collection: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP gateway
    Serve(ServeCommand),

    /// Index schema management
    Index(IndexCommand),

    /// Add a document
    Add(AddCommand),

    /// Fetch a document by id
    Get(GetCommand),

    /// Delete a document by id
    Delete(DeleteCommand),

    /// Semantic search over stored documents
    Search(SearchCommand),

    /// Check store and embedding provider connectivity
    Health(HealthCommand),
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Serve(_) => "serve",
            Commands::Index(_) => "index",
            Commands::Add(_) => "add",
            Commands::Get(_) => "get",
            Commands::Delete(_) => "delete",
            Commands::Search(_) => "search",
            Commands::Health(_) => "health",
        }
    }
}

#[tokio::main]
async fn main() -> AppResult<()> {
    // Parse command-line arguments first (needed for logging config)
    let cli = Cli::parse();

    // --config wins over the environment; everything else comes from the process env
    let config_file = cli.config.clone();
    let config = AppConfig::load_from(|key| match (key, &config_file) {
        ("VECGATE_CONFIG", Some(path)) => Some(path.to_string_lossy().into_owned()),
        _ => std::env::var(key).ok(),
    })?;

    // Only `serve --force-recreate` may drop an existing index
    let force_recreate = matches!(&cli.command, Commands::Serve(cmd) if cmd.force_recreate);

    let config = config.with_overrides(
        cli.log_level,
        cli.verbose,
        cli.no_color,
        cli.store_uri,
        cli.collection,
        force_recreate,
    );

    // Initialize logging with final configuration
    logging::init_logging(config.log_level.as_deref(), config.no_color, config.log_json)?;

    tracing::info!("vecgate starting");
    tracing::debug!("Store: {} at {}", config.store.backend, config.store.uri);
    tracing::debug!(
        "Embedding: {} ({})",
        config.embedding.provider,
        config.embedding.model
    );

    let _span = tracing::info_span!("command", name = cli.command.name()).entered();

    let result = match cli.command {
        Commands::Serve(cmd) => cmd.execute(&config).await,
        Commands::Index(cmd) => cmd.execute(&config).await,
        Commands::Add(cmd) => cmd.execute(&config).await,
        Commands::Get(cmd) => cmd.execute(&config).await,
        Commands::Delete(cmd) => cmd.execute(&config).await,
        Commands::Search(cmd) => cmd.execute(&config).await,
        Commands::Health(cmd) => cmd.execute(&config).await,
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}
