//! Request parsing and validation.
//!
//! A request line is `OPERATION (SP OPERAND)*`. Validation runs in a fixed
//! order and stops at the first failure:
//!
//! 1. empty line
//! 2. unknown operation
//! 3. wrong operand count
//! 4. first operand that is not a number, left to right
//!
//! So `FOO x` is an unknown operation, not a bad operand, and `ADD x` is an
//! arity error, not a bad operand.

use thiserror::Error;

use crate::ops::OperationRegistry;

/// A validated request, ready for dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    operation: String,
    operands: Vec<f64>,
}

impl Request {
    /// Operation name, exactly as received.
    #[inline]
    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Parsed operands, in request order.
    #[inline]
    pub fn operands(&self) -> &[f64] {
        &self.operands
    }
}

/// Why a request line was rejected before any computation.
///
/// The `Display` text is the `INVALID` payload sent on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidRequest {
    /// Line was empty or whitespace only.
    #[error("Malformed request: missing operands")]
    Empty,

    /// No operation of that name is registered.
    #[error("Unknown operation: {0}")]
    UnknownOperation(String),

    /// Operand count differs from the operation's arity.
    #[error("{operation} requires {arity} operand(s), got {got}")]
    WrongArity {
        operation: String,
        arity: usize,
        got: usize,
    },

    /// An operand token is not a decimal number.
    #[error("Invalid operand: '{0}' is not a number")]
    InvalidOperand(String),

    /// The line was not valid UTF-8. Raised by the connection loop, since
    /// the parser only sees decoded text.
    #[error("Malformed request: invalid UTF-8")]
    NotUtf8,
}

/// Parse and validate one request line against `registry`.
///
/// `line` must already be stripped of its terminator.
pub fn parse_request(registry: &OperationRegistry, line: &str) -> Result<Request, InvalidRequest> {
    let mut tokens = line.split_whitespace();

    let Some(name) = tokens.next() else {
        return Err(InvalidRequest::Empty);
    };

    let spec = registry
        .get(name)
        .ok_or_else(|| InvalidRequest::UnknownOperation(name.to_string()))?;

    let raw: Vec<&str> = tokens.collect();
    if raw.len() != spec.arity() {
        return Err(InvalidRequest::WrongArity {
            operation: name.to_string(),
            arity: spec.arity(),
            got: raw.len(),
        });
    }

    let operands = raw
        .iter()
        .map(|token| {
            parse_operand(token).ok_or_else(|| InvalidRequest::InvalidOperand(token.to_string()))
        })
        .collect::<Result<Vec<f64>, _>>()?;

    Ok(Request {
        operation: name.to_string(),
        operands,
    })
}

/// Parse an operand token.
///
/// Accepts an optional leading `-`, decimal digits and at most one `.`, with
/// at least one digit: `42`, `-7`, `3.14`, `.5`, `5.`. Rejects exponents,
/// `+`, `inf`, `nan` and hex. A token too large for `f64` parses to infinity
/// and is caught as overflow by the operation.
pub fn parse_operand(token: &str) -> Option<f64> {
    let unsigned = token.strip_prefix('-').unwrap_or(token);

    let mut seen_digit = false;
    let mut seen_dot = false;
    for b in unsigned.bytes() {
        match b {
            b'0'..=b'9' => seen_digit = true,
            b'.' if !seen_dot => seen_dot = true,
            _ => return None,
        }
    }
    if !seen_digit {
        return None;
    }

    token.parse().ok()
}
