//! Protocol module - CalcProtocol/1.0 requests and responses.
//!
//! This module implements the text protocol carried by the wire codec:
//! - request parsing and validation
//! - response encoding/decoding
//! - [`handle_line`], the full line → response pipeline used by the server

mod request;
mod response;

pub use request::{parse_operand, parse_request, InvalidRequest, Request};
pub use response::{format_number, Response, Status};

use crate::ops::OperationRegistry;

/// Protocol name and version.
pub const PROTOCOL_VERSION: &str = "CalcProtocol/1.0";

/// Validate, dispatch and encode one request line.
///
/// Never fails: every line maps to exactly one `OK`, `ERROR` or `INVALID`
/// response. The function is pure, so the same line always yields the same
/// response.
pub fn handle_line(registry: &OperationRegistry, line: &str) -> Response {
    match parse_request(registry, line) {
        Ok(request) => match registry.dispatch(&request) {
            Some(outcome) => Response::from_outcome(outcome),
            None => Response::invalid(&InvalidRequest::UnknownOperation(
                request.operation().to_string(),
            )),
        },
        Err(invalid) => Response::invalid(&invalid),
    }
}
