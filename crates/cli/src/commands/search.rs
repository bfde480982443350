//! Search command handler.

use super::print_json;
use clap::Args;
use std::time::Instant;
use vecgate_core::{config::AppConfig, AppResult};
use vecgate_engine::Gateway;

/// Semantic search over stored documents
#[derive(Args, Debug)]
pub struct SearchCommand {
    /// Query text
    pub query: String,

    /// Number of results (defaults to 10, capped by VECTOR_MAX_RESULTS)
    #[arg(short = 'k', long)]
    pub limit: Option<usize>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl SearchCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Searching collection '{}'", config.store.collection);

        let gateway = Gateway::connect(config).await?;
        let started = Instant::now();
        let results = gateway.search().search(&self.query, self.limit).await?;
        let elapsed = started.elapsed().as_secs_f64();

        if self.json {
            return print_json(&serde_json::json!({
                "query": self.query,
                "results": results,
                "total": results.len(),
                "search_time": elapsed,
            }));
        }

        if results.is_empty() {
            println!("No results.");
            return Ok(());
        }

        for (rank, result) in results.iter().enumerate() {
            let preview: String = result.document.content.chars().take(100).collect();
            println!(
                "{:>2}. [{:.4}] {}  {}",
                rank + 1,
                result.score,
                result.document.id,
                preview.replace('\n', " ")
            );
        }
        println!("{} result(s) in {:.3}s", results.len(), elapsed);

        Ok(())
    }
}
