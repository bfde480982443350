//! Index command handler.

use super::print_json;
use clap::{Args, Subcommand};
use vecgate_core::{config::AppConfig, AppResult};
use vecgate_engine::Gateway;

/// Index schema management
#[derive(Args, Debug)]
pub struct IndexCommand {
    #[command(subcommand)]
    pub action: IndexAction,
}

#[derive(Subcommand, Debug)]
pub enum IndexAction {
    /// Create the index if missing, or verify it matches the configuration
    Ensure(IndexEnsureCommand),
    /// Show index and model statistics
    Stats(IndexStatsCommand),
}

impl IndexCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        match &self.action {
            IndexAction::Ensure(cmd) => cmd.execute(config).await,
            IndexAction::Stats(cmd) => cmd.execute(config).await,
        }
    }
}

/// Create or verify the index schema
#[derive(Args, Debug)]
pub struct IndexEnsureCommand {
    /// Drop and rebuild even when the schema matches. Destroys stored documents.
    #[arg(long)]
    pub force: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl IndexEnsureCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!(
            "Ensuring schema for collection '{}' (force: {})",
            config.store.collection,
            self.force
        );

        let gateway = Gateway::connect(config).await?;
        let action = gateway.ensure_schema(self.force).await?;

        if self.json {
            print_json(&serde_json::json!({
                "collection": config.store.collection,
                "action": action,
                "schema": gateway.schema(),
            }))?;
        } else {
            println!(
                "Collection '{}': {:?} ({})",
                config.store.collection,
                action,
                gateway.schema()
            );
        }

        Ok(())
    }
}

/// Show index statistics
#[derive(Args, Debug)]
pub struct IndexStatsCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl IndexStatsCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let gateway = Gateway::connect(config).await?;
        let stats = gateway.stats().await?;

        if self.json {
            return print_json(&stats);
        }

        println!("Backend:     {}", stats.backend);
        println!("Collection:  {}", stats.collection);
        match stats.schema {
            Some(schema) => println!("Schema:      {}", schema),
            None => println!("Schema:      (not created)"),
        }
        if let Some(documents) = stats.documents {
            println!("Documents:   {}", documents);
        }
        println!("Provider:    {} ({})", stats.provider, stats.model);

        Ok(())
    }
}
