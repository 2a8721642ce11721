//! Async line reader and writer over a byte stream.
//!
//! [`LineReader`] wraps any `AsyncRead` and yields lines from a
//! [`LineBuffer`]; [`LineWriter`] wraps any `AsyncWrite` and writes one
//! `\n`-terminated line per call, flushing immediately since the peer waits
//! for the complete line.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::LineBuffer;
use crate::error::{CalcError, Result};

/// Read chunk size.
const READ_CHUNK_SIZE: usize = 4 * 1024;

/// Reads newline-delimited UTF-8 lines from a byte stream.
pub struct LineReader<R> {
    reader: R,
    buffer: LineBuffer,
    chunk: Vec<u8>,
}

impl<R: AsyncRead + Unpin> LineReader<R> {
    /// Create a reader with the default maximum line length.
    pub fn new(reader: R) -> Self {
        Self::with_buffer(reader, LineBuffer::new())
    }

    /// Create a reader around a preconfigured buffer.
    pub fn with_buffer(reader: R, buffer: LineBuffer) -> Self {
        Self {
            reader,
            buffer,
            chunk: vec![0u8; READ_CHUNK_SIZE],
        }
    }

    /// Read the next complete line.
    ///
    /// Returns `Ok(None)` when the peer closed the stream between lines.
    /// This method is cancel-safe: bytes already read stay buffered when the
    /// future is dropped (e.g. by `tokio::time::timeout`).
    ///
    /// # Errors
    ///
    /// - [`CalcError::ConnectionClosed`] if the peer closed mid-line
    /// - [`CalcError::Io`] on transport failure
    /// - codec errors from [`LineBuffer::next_line`]
    pub async fn read_line(&mut self) -> Result<Option<String>> {
        loop {
            if let Some(line) = self.buffer.next_line()? {
                return Ok(Some(line));
            }

            let n = self.reader.read(&mut self.chunk).await?;
            if n == 0 {
                if self.buffer.is_empty() {
                    return Ok(None);
                }
                return Err(CalcError::ConnectionClosed);
            }
            self.buffer.extend(&self.chunk[..n]);
        }
    }

    /// Unwrap the underlying reader, dropping any buffered bytes.
    pub fn into_inner(self) -> R {
        self.reader
    }
}

/// Writes `\n`-terminated lines to a byte stream.
pub struct LineWriter<W> {
    writer: W,
}

impl<W: AsyncWrite + Unpin> LineWriter<W> {
    /// Wrap a writer.
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Write `line` followed by a single `\n` and flush.
    ///
    /// Uses an explicit `\n`, never `\r\n`.
    pub async fn write_line(&mut self, line: &str) -> Result<()> {
        let mut out = Vec::with_capacity(line.len() + 1);
        out.extend_from_slice(line.as_bytes());
        out.push(b'\n');
        self.writer.write_all(&out).await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Shut down the write side so the peer sees EOF.
    pub async fn shutdown(&mut self) -> Result<()> {
        self.writer.shutdown().await?;
        Ok(())
    }

    /// Unwrap the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}
