//! Server builder and accept loop.
//!
//! The [`ServerBuilder`] provides a fluent API for configuring the server; the
//! [`Server`] manages the lifecycle:
//! 1. Bind the TCP listener
//! 2. Wait for a free connection slot (bounded mode only)
//! 3. Accept a connection and hand it to its own task
//! 4. Repeat until the shutdown signal fires
//!
//! Bounded and unbounded operation share this loop; the only difference is
//! whether a semaphore permit is taken before each accept. Tokio's semaphore
//! is fair, so waiting connections are admitted in FIFO order.
//!
//! # Example
//!
//! ```ignore
//! use calcwire::Server;
//!
//! #[tokio::main]
//! async fn main() -> calcwire::error::Result<()> {
//!     let server = Server::builder()
//!         .host("127.0.0.1")
//!         .port(8080)
//!         .max_connections(10)
//!         .bind()
//!         .await?;
//!
//!     server.run_until(async { tokio::signal::ctrl_c().await.ok(); }).await
//! }
//! ```

mod connection;
mod stats;

pub use connection::{serve_connection, ConnectionSettings};
pub use stats::{report_periodically, ConnectionGuard, ServerStats, StatsSnapshot};

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::net::TcpStream;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use crate::codec::DEFAULT_MAX_LINE_LENGTH;
use crate::error::{CalcError, Result};
use crate::ops::OperationRegistry;
use crate::transport::Listener;

/// Default listen host.
pub const DEFAULT_HOST: &str = "localhost";

/// Default listen port.
pub const DEFAULT_PORT: u16 = 8080;

/// Default number of connections served at once in bounded mode.
pub const DEFAULT_MAX_CONNECTIONS: usize = 10;

/// Default idle timeout in milliseconds.
pub const DEFAULT_IDLE_TIMEOUT_MS: u64 = 300_000;

/// Default number of requests one connection may make.
pub const DEFAULT_MAX_REQUESTS_PER_CONNECTION: u64 = 1000;

/// Default seconds between statistics reports.
pub const DEFAULT_STATS_INTERVAL_SECS: u64 = 60;

/// Pause after a failed accept so persistent errors (e.g. EMFILE) do not spin.
const ACCEPT_ERROR_DELAY: Duration = Duration::from_millis(100);

/// Server configuration.
///
/// Loadable from JSON; missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host or IP to listen on.
    pub host: String,
    /// Port to listen on; 0 picks a free port.
    pub port: u16,
    /// `Some(n)` serves at most n connections at once, queueing the rest.
    /// `None` serves every connection immediately.
    pub max_connections: Option<usize>,
    /// Milliseconds a connection may stay idle; 0 disables the timeout.
    pub idle_timeout_ms: u64,
    /// Longest accepted request line in bytes.
    pub max_line_length: usize,
    /// Requests answered per connection before it is refused and closed.
    /// `None` removes the cap.
    pub max_requests_per_connection: Option<u64>,
    /// Seconds between statistics log reports; 0 disables them.
    pub stats_interval_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            max_connections: Some(DEFAULT_MAX_CONNECTIONS),
            idle_timeout_ms: DEFAULT_IDLE_TIMEOUT_MS,
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
            max_requests_per_connection: Some(DEFAULT_MAX_REQUESTS_PER_CONNECTION),
            stats_interval_secs: DEFAULT_STATS_INTERVAL_SECS,
        }
    }
}

impl ServerConfig {
    /// Parse a JSON configuration document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse a JSON configuration file.
    pub fn from_json_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// `host:port` listen address.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Idle timeout, if enabled.
    pub fn idle_timeout(&self) -> Option<Duration> {
        (self.idle_timeout_ms > 0).then(|| Duration::from_millis(self.idle_timeout_ms))
    }

    /// Statistics report period, if enabled.
    pub fn stats_interval(&self) -> Option<Duration> {
        (self.stats_interval_secs > 0).then(|| Duration::from_secs(self.stats_interval_secs))
    }

    fn connection_settings(&self) -> ConnectionSettings {
        ConnectionSettings {
            idle_timeout: self.idle_timeout(),
            max_line_length: self.max_line_length,
            max_requests: self.max_requests_per_connection,
        }
    }
}

/// Builder for configuring and creating a [`Server`].
pub struct ServerBuilder {
    config: ServerConfig,
    registry: OperationRegistry,
}

impl ServerBuilder {
    /// Create a builder with default configuration and the standard operations.
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
            registry: OperationRegistry::standard(),
        }
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the listen host.
    pub fn host(mut self, host: &str) -> Self {
        self.config.host = host.to_string();
        self
    }

    /// Set the listen port.
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Serve at most `limit` connections at once; later ones wait.
    ///
    /// Default: 10
    pub fn max_connections(mut self, limit: usize) -> Self {
        self.config.max_connections = Some(limit);
        self
    }

    /// Serve every connection immediately, one task each.
    pub fn unbounded(mut self) -> Self {
        self.config.max_connections = None;
        self
    }

    /// Set the idle timeout. `Duration::ZERO` disables it.
    ///
    /// Default: 300 seconds
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        // Round up so a sub-millisecond timeout is not read as "disabled".
        let millis = timeout.as_millis() + u128::from(timeout.subsec_nanos() % 1_000_000 != 0);
        self.config.idle_timeout_ms = u64::try_from(millis).unwrap_or(u64::MAX);
        self
    }

    /// Cap the requests one connection may make. `None` removes the cap.
    ///
    /// Default: 1000
    pub fn max_requests_per_connection(mut self, limit: Option<u64>) -> Self {
        self.config.max_requests_per_connection = limit;
        self
    }

    /// Set the statistics report period. `Duration::ZERO` disables reports.
    ///
    /// Default: 60 seconds
    pub fn stats_interval(mut self, interval: Duration) -> Self {
        self.config.stats_interval_secs = interval.as_secs().max(u64::from(!interval.is_zero()));
        self
    }

    /// Set the maximum request line length.
    pub fn max_line_length(mut self, limit: usize) -> Self {
        self.config.max_line_length = limit;
        self
    }

    /// Use a custom operation registry.
    pub fn registry(mut self, registry: OperationRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Bind the listener.
    pub async fn bind(self) -> Result<Server> {
        Server::bind(self.config, self.registry).await
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound CalcProtocol server.
pub struct Server {
    listener: Listener,
    registry: Arc<OperationRegistry>,
    config: ServerConfig,
    stats: Arc<ServerStats>,
}

impl Server {
    /// Create a new server builder.
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    async fn bind(config: ServerConfig, registry: OperationRegistry) -> Result<Self> {
        let listener = Listener::bind(config.addr()).await?;
        info!(
            addr = %listener.local_addr()?,
            max_connections = ?config.max_connections,
            idle_timeout_ms = config.idle_timeout_ms,
            max_requests_per_connection = ?config.max_requests_per_connection,
            operations = ?registry.names(),
            "Calculator server listening"
        );

        Ok(Self {
            listener,
            registry: Arc::new(registry),
            config,
            stats: Arc::new(ServerStats::new()),
        })
    }

    /// Bound local address.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Shared statistics counters.
    pub fn stats(&self) -> Arc<ServerStats> {
        self.stats.clone()
    }

    /// Active configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Serve forever.
    pub async fn run(self) -> Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Serve until `shutdown` resolves.
    ///
    /// Stops accepting new connections on shutdown. Connections already being
    /// served keep running until their clients disconnect or go idle.
    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let semaphore = self
            .config
            .max_connections
            .map(|limit| Arc::new(Semaphore::new(limit.max(1))));
        let settings = self.config.connection_settings();
        let reporter = self.config.stats_interval().map(|period| {
            tokio::spawn(report_periodically(self.stats.clone(), period, |snapshot| {
                info!(
                    active = snapshot.active_connections,
                    total_connections = snapshot.total_connections,
                    total_requests = snapshot.total_requests,
                    "Server statistics"
                );
            }))
        });
        tokio::pin!(shutdown);

        loop {
            let permit = match &semaphore {
                Some(semaphore) => tokio::select! {
                    _ = &mut shutdown => break,
                    permit = semaphore.clone().acquire_owned() => match permit {
                        Ok(permit) => Some(permit),
                        Err(_) => break,
                    },
                },
                None => None,
            };

            let (stream, peer) = tokio::select! {
                _ = &mut shutdown => break,
                accepted = self.listener.accept() => match accepted {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        // Most accept errors are transient (e.g. peer reset before accept).
                        error!("Failed to accept connection: {}", e);
                        tokio::time::sleep(ACCEPT_ERROR_DELAY).await;
                        continue;
                    }
                },
            };

            let registry = self.registry.clone();
            let stats = self.stats.clone();
            tokio::spawn(async move {
                // Permit is held until this task completes
                let _permit = permit;
                handle_client(stream, peer, &registry, &settings, &stats).await;
            });
        }

        if let Some(reporter) = reporter {
            reporter.abort();
        }
        info!(stats = ?self.stats.snapshot(), "Calculator server stopped accepting connections");
        Ok(())
    }
}

/// Serve one accepted connection and log how it ended.
async fn handle_client(
    stream: TcpStream,
    peer: SocketAddr,
    registry: &OperationRegistry,
    settings: &ConnectionSettings,
    stats: &Arc<ServerStats>,
) {
    let _guard = stats.open_connection();
    let started = Instant::now();
    info!(%peer, active = stats.active_connections(), "Client connected");

    let (reader, writer) = stream.into_split();
    let outcome = serve_connection(reader, writer, registry, settings, stats).await;
    let duration = started.elapsed();

    match outcome {
        Ok(requests) => {
            info!(%peer, requests, ?duration, "Client disconnected");
        }
        Err(CalcError::Timeout(idle)) => {
            warn!(%peer, ?idle, ?duration, "Closing idle connection");
        }
        Err(CalcError::ConnectionClosed) => {
            info!(%peer, ?duration, "Client disconnected mid-request");
        }
        Err(CalcError::RequestLimit(limit)) => {
            warn!(%peer, limit, ?duration, "Client exceeded request limit");
        }
        Err(e) => {
            error!(%peer, ?duration, "Connection error: {}", e);
        }
    }
}
