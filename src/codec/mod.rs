//! Wire codec - newline-delimited text lines over a byte stream.
//!
//! - [`LineBuffer`] - sync state that turns byte chunks into lines
//! - [`LineReader`] / [`LineWriter`] - async wrappers over tokio I/O
//!
//! The codec knows nothing about requests or responses.

mod line_buffer;
mod stream;

pub use line_buffer::{LineBuffer, DEFAULT_MAX_LINE_LENGTH};
pub use stream::{LineReader, LineWriter};
