//! Transport module - TCP sockets.
//!
//! Provides the listener used by the server and the bounded-time connect used
//! by client sessions.

mod tcp;

pub use tcp::{connect, Listener};
