//! Serve command handler.

use crate::server;
use clap::Args;
use vecgate_core::{config::AppConfig, AppResult};
use vecgate_engine::Gateway;

/// Run the HTTP gateway
#[derive(Args, Debug)]
pub struct ServeCommand {
    /// Address to bind (overrides VECGATE_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind (overrides VECGATE_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Drop and rebuild the index at startup. Destroys stored documents.
    #[arg(long, env = "FORCE_RECREATE_INDEX")]
    pub force_recreate: bool,
}

impl ServeCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let mut config = config.clone();
        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }

        if config.vector.force_recreate_index {
            tracing::warn!(
                "Force-recreating collection '{}'; existing documents will be dropped",
                config.store.collection
            );
        }

        let gateway = Gateway::from_config(&config).await?;
        server::run_server(gateway, &config.bind_address()).await
    }
}
