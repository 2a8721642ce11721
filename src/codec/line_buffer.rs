//! Line buffer for accumulating partial reads.
//!
//! Uses `bytes::BytesMut` so complete lines are split off the front of the
//! buffer without copying the remainder. Bytes arrive in arbitrary chunks from
//! the socket; a line is complete once its `\n` has been seen.
//!
//! # Example
//!
//! ```
//! use calcwire::codec::LineBuffer;
//!
//! let mut buffer = LineBuffer::new();
//!
//! let lines = buffer.push(b"ADD 1 2\r\nSQ").unwrap();
//! assert_eq!(lines, vec!["ADD 1 2".to_string()]);
//!
//! let lines = buffer.push(b"RT 9\n").unwrap();
//! assert_eq!(lines, vec!["SQRT 9".to_string()]);
//! ```

use bytes::BytesMut;

use crate::error::{CalcError, Result};

/// Default maximum line length in bytes, terminators excluded.
pub const DEFAULT_MAX_LINE_LENGTH: usize = 8 * 1024;

/// Buffer for accumulating incoming bytes and extracting complete lines.
pub struct LineBuffer {
    /// Accumulated bytes from socket reads.
    buffer: BytesMut,
    /// Prefix of `buffer` already known to contain no `\n`.
    scanned: usize,
    /// Maximum allowed line length.
    max_line_length: usize,
}

impl LineBuffer {
    /// Create a new line buffer with the default maximum line length.
    pub fn new() -> Self {
        Self::with_max_line_length(DEFAULT_MAX_LINE_LENGTH)
    }

    /// Create a new line buffer with a custom maximum line length.
    pub fn with_max_line_length(max_line_length: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(1024),
            scanned: 0,
            max_line_length,
        }
    }

    /// Push data into the buffer and extract all complete lines.
    ///
    /// Partial data is kept for the next push.
    ///
    /// # Errors
    ///
    /// Returns [`CalcError::LineTooLong`] or [`CalcError::InvalidUtf8`] when a
    /// line violates the codec rules. Lines extracted before the bad one are
    /// discarded along with the error.
    pub fn push(&mut self, data: &[u8]) -> Result<Vec<String>> {
        self.extend(data);

        let mut lines = Vec::new();
        while let Some(line) = self.next_line()? {
            lines.push(line);
        }
        Ok(lines)
    }

    /// Append raw bytes without extracting anything.
    pub fn extend(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Try to extract a single line from the buffer.
    ///
    /// Returns:
    /// - `Ok(Some(line))` if a complete line was extracted
    /// - `Ok(None)` if more data is needed
    /// - `Err(...)` if the line is too long or not UTF-8
    pub fn next_line(&mut self) -> Result<Option<String>> {
        let newline = self.buffer[self.scanned..]
            .iter()
            .position(|&b| b == b'\n')
            .map(|offset| self.scanned + offset);

        let Some(end) = newline else {
            self.scanned = self.buffer.len();
            // A trailing '\r' may still be followed by its '\n'.
            if self.buffer.len() > self.max_line_length + 1 {
                return Err(CalcError::LineTooLong(self.max_line_length));
            }
            return Ok(None);
        };

        let mut line = self.buffer.split_to(end + 1);
        self.scanned = 0;
        line.truncate(end);
        if line.last() == Some(&b'\r') {
            line.truncate(end - 1);
        }

        if line.len() > self.max_line_length {
            return Err(CalcError::LineTooLong(self.max_line_length));
        }

        String::from_utf8(line.to_vec())
            .map(Some)
            .map_err(|_| CalcError::InvalidUtf8)
    }

    /// Number of buffered bytes not yet returned as a line.
    #[inline]
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Whether no partial line is buffered.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Drop any buffered partial line.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.scanned = 0;
    }
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_line() {
        let mut buffer = LineBuffer::new();
        let lines = buffer.push(b"ADD 15 25\n").unwrap();
        assert_eq!(lines, vec!["ADD 15 25"]);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_strips_carriage_return() {
        let mut buffer = LineBuffer::new();
        let lines = buffer.push(b"SQRT 81\r\n").unwrap();
        assert_eq!(lines, vec!["SQRT 81"]);
    }

    #[test]
    fn test_only_one_carriage_return_stripped() {
        let mut buffer = LineBuffer::new();
        let lines = buffer.push(b"X\r\r\n").unwrap();
        assert_eq!(lines, vec!["X\r"]);
    }

    #[test]
    fn test_multiple_lines_in_one_chunk() {
        let mut buffer = LineBuffer::new();
        let lines = buffer.push(b"ADD 1 2\nSUB 3 4\nMUL 5 6\n").unwrap();
        assert_eq!(lines, vec!["ADD 1 2", "SUB 3 4", "MUL 5 6"]);
    }

    #[test]
    fn test_fragmented_line() {
        let mut buffer = LineBuffer::new();

        assert!(buffer.push(b"DI").unwrap().is_empty());
        assert!(buffer.push(b"V 100").unwrap().is_empty());
        assert_eq!(buffer.buffered_len(), 7);

        let lines = buffer.push(b" 4\nPOW").unwrap();
        assert_eq!(lines, vec!["DIV 100 4"]);
        assert_eq!(buffer.buffered_len(), 3);
    }

    #[test]
    fn test_carriage_return_split_from_newline() {
        let mut buffer = LineBuffer::new();
        assert!(buffer.push(b"ADD 1 1\r").unwrap().is_empty());
        assert_eq!(buffer.push(b"\n").unwrap(), vec!["ADD 1 1"]);
    }

    #[test]
    fn test_empty_line() {
        let mut buffer = LineBuffer::new();
        let lines = buffer.push(b"\n\r\n").unwrap();
        assert_eq!(lines, vec!["", ""]);
    }

    #[test]
    fn test_line_too_long_without_newline() {
        let mut buffer = LineBuffer::with_max_line_length(8);
        let result = buffer.push(b"0123456789");
        assert!(matches!(result, Err(CalcError::LineTooLong(8))));
    }

    #[test]
    fn test_line_too_long_with_newline() {
        let mut buffer = LineBuffer::with_max_line_length(4);
        let result = buffer.push(b"ADD 1 2\n");
        assert!(matches!(result, Err(CalcError::LineTooLong(4))));
    }

    #[test]
    fn test_line_at_limit_accepted() {
        let mut buffer = LineBuffer::with_max_line_length(7);
        let lines = buffer.push(b"ADD 1 2\r\n").unwrap();
        assert_eq!(lines, vec!["ADD 1 2"]);
    }

    #[test]
    fn test_invalid_utf8() {
        let mut buffer = LineBuffer::new();
        let result = buffer.push(&[0xff, 0xfe, b'\n']);
        assert!(matches!(result, Err(CalcError::InvalidUtf8)));
    }

    #[test]
    fn test_utf8_split_across_chunks() {
        let mut buffer = LineBuffer::new();
        let text = "ADD π 1\n".as_bytes();
        assert!(buffer.push(&text[..5]).unwrap().is_empty());
        assert_eq!(buffer.push(&text[5..]).unwrap(), vec!["ADD π 1"]);
    }

    #[test]
    fn test_clear() {
        let mut buffer = LineBuffer::new();
        buffer.push(b"partial").unwrap();
        buffer.clear();
        assert!(buffer.is_empty());
        assert_eq!(buffer.push(b"fresh\n").unwrap(), vec!["fresh"]);
    }
}
