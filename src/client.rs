//! Client session with reconnect and exponential backoff.
//!
//! A [`Session`] owns at most one TCP connection and moves through
//! [`SessionState`]:
//!
//! ```text
//! Disconnected ─connect─► Connecting ─ok─► Connected
//!      ▲                      │                │
//!      └────────error─────────┘◄──send/recv────┘
//!
//! reconnect() with attempts >= max ─► Failed ─reset_attempts─► Disconnected
//! ```
//!
//! Each request is a send followed by a wait for exactly one response line,
//! bounded by the request timeout. Nothing is replayed after a reconnect; the
//! caller decides whether to resend.
//!
//! # Example
//!
//! ```ignore
//! use calcwire::{Session, SessionConfig};
//!
//! let mut session = Session::new(SessionConfig::new("localhost", 8080));
//! session.connect().await?;
//!
//! let response = session.request("ADD 15 25").await?;
//! assert_eq!(response.encode(), "OK 40");
//! ```

use std::time::Duration;

use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tracing::{debug, info, warn};

use crate::codec::{LineReader, LineWriter};
use crate::error::{CalcError, Result};
use crate::protocol::Response;
use crate::transport;

/// Default connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default time to wait for a response.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Default number of reconnect attempts before giving up.
pub const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 3;

/// Default backoff unit; attempt n waits `unit * 2^n`.
pub const DEFAULT_BACKOFF_UNIT: Duration = Duration::from_secs(1);

/// Configuration for a [`Session`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Server host.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Give up a connect attempt after this long.
    pub connect_timeout: Duration,
    /// Give up waiting for a response after this long.
    pub request_timeout: Duration,
    /// Reconnect attempts allowed before the session fails.
    pub max_reconnect_attempts: u32,
    /// Backoff time unit.
    pub backoff_unit: Duration,
}

impl SessionConfig {
    /// Configuration for `host:port` with default timeouts.
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            host: host.to_string(),
            port,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            max_reconnect_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
            backoff_unit: DEFAULT_BACKOFF_UNIT,
        }
    }

    /// Set the connect timeout.
    ///
    /// Default: 10 seconds
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the response timeout.
    ///
    /// Default: 30 seconds
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the reconnect attempt cap.
    ///
    /// Default: 3
    pub fn with_max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.max_reconnect_attempts = attempts;
        self
    }

    /// Set the backoff unit.
    ///
    /// Default: 1 second
    pub fn with_backoff_unit(mut self, unit: Duration) -> Self {
        self.backoff_unit = unit;
        self
    }

    /// `host:port` server address.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Delay before reconnect attempt `attempt` (1-based): `unit * 2^attempt`.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        self.backoff_unit
            .saturating_mul(2u32.saturating_pow(attempt))
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new(crate::server::DEFAULT_HOST, crate::server::DEFAULT_PORT)
    }
}

/// Connection state of a [`Session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// No connection; `connect` or `reconnect` may be called.
    Disconnected,
    /// A connect attempt is in progress.
    Connecting,
    /// Connected and ready for requests.
    Connected,
    /// Reconnect attempts exhausted; see [`Session::reset_attempts`].
    Failed,
}

/// The two halves of an open connection.
struct Connection {
    reader: LineReader<OwnedReadHalf>,
    writer: LineWriter<OwnedWriteHalf>,
}

/// A client session talking to one server.
pub struct Session {
    config: SessionConfig,
    state: SessionState,
    /// Consecutive reconnect attempts since the last successful connect.
    attempts: u32,
    connection: Option<Connection>,
}

impl Session {
    /// Create a disconnected session.
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            state: SessionState::Disconnected,
            attempts: 0,
            connection: None,
        }
    }

    /// Current state.
    #[inline]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Whether a connection is open.
    #[inline]
    pub fn is_connected(&self) -> bool {
        self.state == SessionState::Connected
    }

    /// Reconnect attempts made since the last successful connect.
    #[inline]
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Session configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Open the connection.
    ///
    /// A no-op when already connected. Success resets the attempt counter.
    ///
    /// # Errors
    ///
    /// - [`CalcError::ReconnectExhausted`] in the `Failed` state
    /// - [`CalcError::Timeout`] or [`CalcError::Io`] if the connect fails;
    ///   the session returns to `Disconnected`
    pub async fn connect(&mut self) -> Result<()> {
        match self.state {
            SessionState::Connected => return Ok(()),
            SessionState::Failed => return Err(CalcError::ReconnectExhausted(self.attempts)),
            SessionState::Disconnected | SessionState::Connecting => {}
        }

        self.state = SessionState::Connecting;
        let addr = self.config.addr();
        debug!(%addr, "Connecting");

        match transport::connect(&addr, self.config.connect_timeout).await {
            Ok(stream) => {
                let (reader, writer) = stream.into_split();
                self.connection = Some(Connection {
                    reader: LineReader::new(reader),
                    writer: LineWriter::new(writer),
                });
                self.state = SessionState::Connected;
                self.attempts = 0;
                info!(%addr, "Connected");
                Ok(())
            }
            Err(e) => {
                self.state = SessionState::Disconnected;
                warn!(%addr, "Connect failed: {}", e);
                Err(e)
            }
        }
    }

    /// Send one request line and wait for its response.
    ///
    /// `INVALID` and `ERROR` responses are returned as `Ok`; only transport
    /// problems are errors.
    ///
    /// # Errors
    ///
    /// - [`CalcError::NotConnected`] if there is no open connection
    /// - [`CalcError::Protocol`] if `line` spans more than one line; the
    ///   connection stays open
    /// - [`CalcError::Timeout`], [`CalcError::ConnectionClosed`],
    ///   [`CalcError::Io`] or a malformed reply; the session drops the
    ///   connection and moves to `Disconnected`
    pub async fn request(&mut self, line: &str) -> Result<Response> {
        if line.contains(['\n', '\r']) {
            return Err(CalcError::Protocol(
                "request must be a single line".to_string(),
            ));
        }

        let connection = self.connection.as_mut().ok_or(CalcError::NotConnected)?;
        let result = exchange(connection, line, self.config.request_timeout).await;

        if let Err(e) = &result {
            if e.is_transport() {
                warn!(addr = %self.config.addr(), "Connection lost: {}", e);
                self.drop_connection();
            }
        }
        result
    }

    /// Reconnect after exponential backoff.
    ///
    /// Attempt n (1-based) first sleeps `backoff_unit * 2^n`. Once
    /// `max_reconnect_attempts` attempts have failed, the next call moves the
    /// session to `Failed` without touching the network.
    ///
    /// # Errors
    ///
    /// - [`CalcError::ReconnectExhausted`] when the cap is reached
    /// - the connect error of this attempt otherwise
    pub async fn reconnect(&mut self) -> Result<()> {
        if self.attempts >= self.config.max_reconnect_attempts {
            self.drop_connection();
            self.state = SessionState::Failed;
            warn!(
                attempts = self.attempts,
                "Maximum reconnection attempts reached"
            );
            return Err(CalcError::ReconnectExhausted(self.attempts));
        }

        self.drop_connection();
        self.attempts += 1;
        let delay = self.config.backoff_delay(self.attempts);
        info!(
            attempt = self.attempts,
            max = self.config.max_reconnect_attempts,
            ?delay,
            "Attempting to reconnect"
        );
        tokio::time::sleep(delay).await;

        self.connect().await
    }

    /// Clear the attempt counter, leaving the `Failed` state.
    pub fn reset_attempts(&mut self) {
        self.attempts = 0;
        if self.state == SessionState::Failed {
            self.state = SessionState::Disconnected;
        }
    }

    /// Close the connection, signalling EOF to the server.
    pub async fn disconnect(&mut self) {
        if let Some(mut connection) = self.connection.take() {
            if let Err(e) = connection.writer.shutdown().await {
                debug!("Shutdown failed: {}", e);
            }
        }
        if self.state == SessionState::Connected {
            self.state = SessionState::Disconnected;
        }
    }

    /// Send each command in turn and collect the results.
    ///
    /// Stops after the first transport failure, whose error is the last
    /// entry.
    pub async fn run_batch<S: AsRef<str>>(
        &mut self,
        commands: &[S],
    ) -> Vec<(String, Result<Response>)> {
        let mut results = Vec::with_capacity(commands.len());
        for command in commands {
            let command = command.as_ref();
            let result = self.request(command).await;
            let stop = matches!(&result, Err(e) if e.is_transport() || matches!(e, CalcError::NotConnected));
            results.push((command.to_string(), result));
            if stop {
                break;
            }
        }
        results
    }

    fn drop_connection(&mut self) {
        self.connection = None;
        if self.state == SessionState::Connected {
            self.state = SessionState::Disconnected;
        }
    }
}

/// Write one request and read one response.
async fn exchange(connection: &mut Connection, line: &str, timeout: Duration) -> Result<Response> {
    connection.writer.write_line(line).await?;

    let reply = tokio::time::timeout(timeout, connection.reader.read_line())
        .await
        .map_err(|_| CalcError::Timeout(timeout))??
        .ok_or(CalcError::ConnectionClosed)?;

    Response::parse(&reply)
}
