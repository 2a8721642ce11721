//! Response encoding and decoding.
//!
//! A response line is `STATUS SP PAYLOAD` where STATUS is one of `OK`,
//! `ERROR` or `INVALID`. There is no other status.

use std::fmt;

use super::InvalidRequest;
use crate::error::{CalcError, Result};
use crate::ops::{DispatchOutcome, MathError};

/// Response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// Computation succeeded; payload is the number.
    Ok,
    /// Computation failed; payload is the math error.
    Error,
    /// Request rejected before computation; payload is the reason.
    Invalid,
}

impl Status {
    /// Wire spelling.
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Ok => "OK",
            Status::Error => "ERROR",
            Status::Invalid => "INVALID",
        }
    }

    /// Parse the wire spelling.
    pub fn from_wire(s: &str) -> Option<Self> {
        match s {
            "OK" => Some(Status::Ok),
            "ERROR" => Some(Status::Error),
            "INVALID" => Some(Status::Invalid),
            _ => None,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One response line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    status: Status,
    payload: String,
}

impl Response {
    /// `OK <value>`.
    pub fn success(value: f64) -> Self {
        Self {
            status: Status::Ok,
            payload: format_number(value),
        }
    }

    /// `ERROR <message>`.
    pub fn math_error(error: MathError) -> Self {
        Self {
            status: Status::Error,
            payload: error.to_string(),
        }
    }

    /// `ERROR <message>` for a request the server declines to compute.
    pub fn refusal(message: &str) -> Self {
        Self {
            status: Status::Error,
            payload: message.to_string(),
        }
    }

    /// `INVALID <message>`.
    pub fn invalid(error: &InvalidRequest) -> Self {
        Self {
            status: Status::Invalid,
            payload: error.to_string(),
        }
    }

    /// Build from a dispatch outcome.
    pub fn from_outcome(outcome: DispatchOutcome) -> Self {
        match outcome {
            Ok(value) => Self::success(value),
            Err(error) => Self::math_error(error),
        }
    }

    /// Response status.
    #[inline]
    pub fn status(&self) -> Status {
        self.status
    }

    /// Response payload.
    #[inline]
    pub fn payload(&self) -> &str {
        &self.payload
    }

    /// Whether the status is `OK`.
    #[inline]
    pub fn is_ok(&self) -> bool {
        self.status == Status::Ok
    }

    /// Numeric value of an `OK` response.
    pub fn value(&self) -> Option<f64> {
        match self.status {
            Status::Ok => self.payload.parse().ok(),
            Status::Error | Status::Invalid => None,
        }
    }

    /// Encode as a wire line, without terminator.
    pub fn encode(&self) -> String {
        format!("{} {}", self.status, self.payload)
    }

    /// Decode a wire line received by a client.
    ///
    /// # Errors
    ///
    /// Returns [`CalcError::Protocol`] if the status is missing or unknown.
    pub fn parse(line: &str) -> Result<Self> {
        let (status, payload) = line
            .split_once(' ')
            .ok_or_else(|| CalcError::Protocol(format!("malformed response: {line:?}")))?;

        let status = Status::from_wire(status)
            .ok_or_else(|| CalcError::Protocol(format!("unknown status: {status:?}")))?;

        Ok(Self {
            status,
            payload: payload.to_string(),
        })
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.status, self.payload)
    }
}

/// Render a result value.
///
/// Whole numbers have no fractional part (`8`, not `8.0`), other values use
/// the shortest decimal that round-trips, and `-0` renders as `0`.
pub fn format_number(value: f64) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    format!("{value}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_whole_numbers() {
        assert_eq!(format_number(40.0), "40");
        assert_eq!(format_number(-15.0), "-15");
        assert_eq!(format_number(1024.0), "1024");
        assert_eq!(format_number(1e21), "1000000000000000000000");
    }

    #[test]
    fn test_format_fractions() {
        assert_eq!(format_number(0.25), "0.25");
        assert_eq!(format_number(-2.5), "-2.5");
        assert_eq!(format_number(0.1 + 0.2), "0.30000000000000004");
    }

    #[test]
    fn test_format_negative_zero() {
        assert_eq!(format_number(-0.0), "0");
    }

    #[test]
    fn test_encode_each_status() {
        assert_eq!(Response::success(40.0).encode(), "OK 40");
        assert_eq!(
            Response::math_error(MathError::DivisionByZero).encode(),
            "ERROR Division by zero"
        );
        assert_eq!(
            Response::invalid(&InvalidRequest::UnknownOperation("UNKNOWN".into())).encode(),
            "INVALID Unknown operation: UNKNOWN"
        );
    }

    #[test]
    fn test_from_outcome() {
        assert_eq!(Response::from_outcome(Ok(9.0)).encode(), "OK 9");
        assert_eq!(
            Response::from_outcome(Err(MathError::Overflow)).encode(),
            "ERROR Result overflow: number too large"
        );
        assert_eq!(
            Response::from_outcome(Err(MathError::NegativeSquareRoot)).encode(),
            "ERROR Cannot calculate square root of negative number"
        );
    }

    #[test]
    fn test_display_matches_encode() {
        let response = Response::success(2.5);
        assert_eq!(response.to_string(), response.encode());
    }

    #[test]
    fn test_parse_response() {
        let response = Response::parse("OK 25").unwrap();
        assert!(response.is_ok());
        assert_eq!(response.value(), Some(25.0));

        let response = Response::parse("ERROR Division by zero").unwrap();
        assert_eq!(response.status(), Status::Error);
        assert_eq!(response.payload(), "Division by zero");
        assert_eq!(response.value(), None);

        let response = Response::parse("INVALID ADD requires 2 operand(s), got 1").unwrap();
        assert_eq!(response.status(), Status::Invalid);
        assert_eq!(response.payload(), "ADD requires 2 operand(s), got 1");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(matches!(Response::parse("OK"), Err(CalcError::Protocol(_))));
        assert!(matches!(
            Response::parse("UNKNOWN something"),
            Err(CalcError::Protocol(_))
        ));
        assert!(matches!(Response::parse(""), Err(CalcError::Protocol(_))));
    }

    #[test]
    fn test_status_wire_names() {
        for status in [Status::Ok, Status::Error, Status::Invalid] {
            assert_eq!(Status::from_wire(status.as_str()), Some(status));
        }
        assert_eq!(Status::from_wire("ok"), None);
    }
}
