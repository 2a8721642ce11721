//! Per-connection request loop.
//!
//! Each accepted connection is served by one task running
//! [`serve_connection`]: read a line, answer it, repeat. The loop owns its
//! stream halves and only borrows the shared registry, so nothing it does can
//! reach another connection.

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::debug;

use super::ServerStats;
use crate::codec::{LineBuffer, LineReader, LineWriter};
use crate::error::{CalcError, Result};
use crate::ops::OperationRegistry;
use crate::protocol::{handle_line, InvalidRequest, Response};

/// Limits applied to every connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionSettings {
    /// Close the connection after this long without a complete request, or
    /// when a response cannot be written for this long.
    pub idle_timeout: Option<Duration>,
    /// Longest accepted request line.
    pub max_line_length: usize,
    /// Requests answered before the connection is refused further service.
    pub max_requests: Option<u64>,
}

/// `ERROR` payload sent once a connection has used up its request allowance.
pub const REQUEST_LIMIT_MESSAGE: &str = "Too many requests - connection limit reached";

/// Serve requests until the peer closes the connection.
///
/// Returns the number of requests answered.
///
/// # Errors
///
/// - [`CalcError::Timeout`] when the idle timeout expires, waiting for a
///   request or for the peer to take a response
/// - [`CalcError::RequestLimit`] after answering `max_requests` requests; the
///   next request gets an `ERROR` reply before the connection closes
/// - [`CalcError::ConnectionClosed`] if the peer closed mid-line
/// - [`CalcError::LineTooLong`] or [`CalcError::Io`] on a broken stream
///
/// Protocol and math errors are answered on the wire and never end the loop.
pub async fn serve_connection<R, W>(
    reader: R,
    writer: W,
    registry: &OperationRegistry,
    settings: &ConnectionSettings,
    stats: &ServerStats,
) -> Result<u64>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines =
        LineReader::with_buffer(reader, LineBuffer::with_max_line_length(settings.max_line_length));
    let mut out = LineWriter::new(writer);
    let mut served = 0u64;

    loop {
        let next = match settings.idle_timeout {
            Some(limit) => tokio::time::timeout(limit, lines.read_line())
                .await
                .map_err(|_| CalcError::Timeout(limit))?,
            None => lines.read_line().await,
        };

        if let (Ok(Some(_)) | Err(CalcError::InvalidUtf8), Some(limit)) =
            (&next, settings.max_requests)
        {
            if served >= limit {
                let refusal = Response::refusal(REQUEST_LIMIT_MESSAGE);
                write_response(&mut out, &refusal, settings.idle_timeout).await?;
                return Err(CalcError::RequestLimit(limit));
            }
        }

        let response = match next {
            Ok(Some(line)) => {
                let response = handle_line(registry, &line);
                debug!(request = %line, response = %response, "Handled request");
                response
            }
            Ok(None) => return Ok(served),
            Err(CalcError::InvalidUtf8) => Response::invalid(&InvalidRequest::NotUtf8),
            Err(e) => return Err(e),
        };

        served += 1;
        stats.request_handled();
        write_response(&mut out, &response, settings.idle_timeout).await?;
    }
}

/// Write one response, giving up if the peer stops reading for `timeout`.
async fn write_response<W>(
    out: &mut LineWriter<W>,
    response: &Response,
    timeout: Option<Duration>,
) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let line = response.encode();
    match timeout {
        Some(limit) => tokio::time::timeout(limit, out.write_line(&line))
            .await
            .map_err(|_| CalcError::Timeout(limit))?,
        None => out.write_line(&line).await,
    }
}
