//! Error types for calcwire.
//!
//! Only transport and local failures live here. Protocol errors
//! ([`InvalidRequest`](crate::protocol::InvalidRequest)) and math errors
//! ([`MathError`](crate::ops::MathError)) are separate types because they are
//! answered on the wire instead of tearing down the connection.

use std::time::Duration;

use thiserror::Error;

/// Main error type for all calcwire operations.
#[derive(Debug, Error)]
pub enum CalcError {
    /// I/O error during socket operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error while loading configuration.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Peer closed the connection (possibly in the middle of a line).
    #[error("Connection closed")]
    ConnectionClosed,

    /// A connect, read or response wait did not finish in time.
    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    /// A received line was not valid UTF-8.
    #[error("Invalid UTF-8 in received line")]
    InvalidUtf8,

    /// A received line exceeded the configured maximum length.
    #[error("Line exceeds maximum length of {0} bytes")]
    LineTooLong(usize),

    /// A received response line did not follow the response grammar.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// A connection used up its request allowance and was closed.
    #[error("Request limit of {0} reached")]
    RequestLimit(u64),

    /// The session has no open connection.
    #[error("Not connected")]
    NotConnected,

    /// The session gave up reconnecting; call `reset_attempts` to try again.
    #[error("Reconnect abandoned after {0} attempts")]
    ReconnectExhausted(u32),
}

impl CalcError {
    /// Whether this error means the connection is no longer usable.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            CalcError::Io(_)
                | CalcError::ConnectionClosed
                | CalcError::Timeout(_)
                | CalcError::InvalidUtf8
                | CalcError::LineTooLong(_)
                | CalcError::Protocol(_)
        )
    }
}

/// Result type alias using CalcError.
pub type Result<T> = std::result::Result<T, CalcError>;
