//! Health command handler.

use super::print_json;
use clap::Args;
use vecgate_core::{config::AppConfig, AppError, AppResult};
use vecgate_engine::Gateway;

/// Check store and embedding provider connectivity
#[derive(Args, Debug)]
pub struct HealthCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl HealthCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let gateway = Gateway::connect(config).await?;
        let report = gateway.health().await;

        if self.json {
            print_json(&report)?;
        } else {
            println!("Status:    {}", report.status);
            println!("Store:     {}", if report.store_connected { "connected" } else { "unreachable" });
            println!("Provider:  {}", if report.provider_ready { "ready" } else { "not ready" });
        }

        if report.is_healthy() {
            Ok(())
        } else {
            Err(AppError::Other("Gateway is unhealthy".to_string()))
        }
    }
}
