//! Document command handlers: add, get, delete.

use super::print_json;
use clap::Args;
use vecgate_core::{config::AppConfig, AppError, AppResult};
use vecgate_engine::{Document, Gateway, NewDocument};

/// Add a document
#[derive(Args, Debug)]
pub struct AddCommand {
    /// Document text
    pub content: String,

    /// Explicit id. An existing document with this id is replaced.
    #[arg(long)]
    pub id: Option<String>,

    /// Metadata as a JSON object
    #[arg(long)]
    pub metadata: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl AddCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let mut new = NewDocument::new(self.content.clone());
        if let Some(id) = &self.id {
            new = new.with_id(id.clone());
        }
        if let Some(raw) = &self.metadata {
            let metadata: serde_json::Value = serde_json::from_str(raw)
                .map_err(|e| AppError::InvalidInput(format!("Invalid --metadata JSON: {}", e)))?;
            new = new.with_metadata(metadata);
        }

        let gateway = Gateway::connect(config).await?;
        gateway.ensure_schema_exists().await?;
        let document = gateway.store().create(new).await?;

        if self.json {
            print_json(&document.without_embedding())
        } else {
            println!("{}", document.id);
            Ok(())
        }
    }
}

/// Fetch a document by id
#[derive(Args, Debug)]
pub struct GetCommand {
    /// Document id
    pub id: String,

    /// Include the stored embedding in JSON output
    #[arg(long)]
    pub with_embedding: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl GetCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let gateway = Gateway::connect(config).await?;
        let document = gateway.store().get(&self.id).await?;

        if self.json {
            let document = if self.with_embedding {
                document
            } else {
                document.without_embedding()
            };
            return print_json(&document);
        }

        print_document(&document);
        Ok(())
    }
}

fn print_document(document: &Document) {
    println!("id:         {}", document.id);
    println!("created_at: {}", document.created_at.to_rfc3339());
    println!("metadata:   {}", document.metadata);
    println!();
    println!("{}", document.content);
}

/// Delete a document by id
#[derive(Args, Debug)]
pub struct DeleteCommand {
    /// Document id
    pub id: String,
}

impl DeleteCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let gateway = Gateway::connect(config).await?;
        gateway.store().delete(&self.id).await?;
        println!("Deleted {}", self.id);
        Ok(())
    }
}
