//! CalcProtocol/1.0 server.
//!
//! ```text
//! calcd --host 0.0.0.0 --port 8080 --max-connections 10 --idle-timeout 300
//! calcd --config server.json --unbounded
//! ```

use std::path::PathBuf;

use anyhow::Context;
use calcwire::{Server, ServerConfig};
use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "calcd", version, about = "CalcProtocol/1.0 calculator server")]
struct Args {
    /// JSON configuration file; flags override its values.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Host or IP to listen on.
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on.
    #[arg(long)]
    port: Option<u16>,

    /// Serve at most N connections at once; later ones wait for a slot.
    #[arg(long, value_name = "N", conflicts_with = "unbounded")]
    max_connections: Option<usize>,

    /// Serve every connection immediately.
    #[arg(long)]
    unbounded: bool,

    /// Close connections idle for this many seconds (0 disables).
    #[arg(long, value_name = "SECS")]
    idle_timeout: Option<u64>,

    /// Requests one connection may make before it is closed (0 removes the cap).
    #[arg(long, value_name = "N")]
    max_requests: Option<u64>,

    /// Seconds between statistics reports (0 disables).
    #[arg(long, value_name = "SECS")]
    stats_interval: Option<u64>,
}

impl Args {
    fn into_config(self) -> anyhow::Result<ServerConfig> {
        let mut config = match &self.config {
            Some(path) => ServerConfig::from_json_file(path)
                .with_context(|| format!("failed to load config from {}", path.display()))?,
            None => ServerConfig::default(),
        };

        if let Some(host) = self.host {
            config.host = host;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(limit) = self.max_connections {
            config.max_connections = Some(limit);
        }
        if self.unbounded {
            config.max_connections = None;
        }
        if let Some(secs) = self.idle_timeout {
            config.idle_timeout_ms = secs.saturating_mul(1000);
        }
        if let Some(limit) = self.max_requests {
            config.max_requests_per_connection = (limit > 0).then_some(limit);
        }
        if let Some(secs) = self.stats_interval {
            config.stats_interval_secs = secs;
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    calcwire::telemetry::init("calcwire=info,calcd=info")?;

    let config = args.into_config()?;
    let addr = config.addr();
    let server = Server::builder()
        .config(config)
        .bind()
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
                std::future::pending::<()>().await;
            }
            tracing::info!("Shutdown requested");
        })
        .await?;

    Ok(())
}
