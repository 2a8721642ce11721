//! # calcwire
//!
//! CalcProtocol/1.0: arithmetic requests over a line-oriented TCP protocol.
//!
//! ## Wire format
//!
//! ```text
//! Request  ::= OPERATION (SP OPERAND)*      e.g. "ADD 15 25"
//! Response ::= STATUS SP PAYLOAD            e.g. "OK 40"
//! STATUS   ::= "OK" | "ERROR" | "INVALID"
//! ```
//!
//! ## Architecture
//!
//! - **Codec** ([`codec`]): bytes ⇄ `\n`-terminated UTF-8 lines
//! - **Protocol** ([`protocol`]): request validation, response encoding
//! - **Operations** ([`ops`]): read-only registry of arithmetic functions
//! - **Server** ([`server`]): one task per connection, bounded or unbounded
//! - **Client** ([`Session`]): request/response with reconnect and backoff
//!
//! ## Example
//!
//! ```ignore
//! use calcwire::{Server, Session, SessionConfig};
//!
//! #[tokio::main]
//! async fn main() -> calcwire::error::Result<()> {
//!     let server = Server::builder().host("127.0.0.1").port(0).bind().await?;
//!     let port = server.local_addr()?.port();
//!     tokio::spawn(server.run());
//!
//!     let mut session = Session::new(SessionConfig::new("127.0.0.1", port));
//!     session.connect().await?;
//!     let response = session.request("SQRT 81").await?;
//!     assert_eq!(response.encode(), "OK 9");
//!     Ok(())
//! }
//! ```

pub mod codec;
pub mod error;
pub mod ops;
pub mod protocol;
pub mod server;
pub mod telemetry;
pub mod transport;

mod client;

pub use client::{Session, SessionConfig, SessionState};
pub use error::CalcError;
pub use ops::{MathError, OperationRegistry};
pub use protocol::{handle_line, InvalidRequest, Response, Status};
pub use server::{Server, ServerBuilder, ServerConfig};
