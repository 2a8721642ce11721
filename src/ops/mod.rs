//! Operation registry and dispatcher.
//!
//! Provides:
//! - [`OperationRegistry`] - maps operation names to arity and function
//! - [`MathError`] - computation failures reported as `ERROR` responses

mod arithmetic;
mod registry;

pub use registry::{DispatchOutcome, Evaluate, OperationRegistry, OperationSpec};

use thiserror::Error;

/// Failure of a computation on an otherwise well-formed request.
///
/// The `Display` text is the `ERROR` payload sent on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MathError {
    /// Divisor was zero.
    #[error("Division by zero")]
    DivisionByZero,

    /// SQRT of a negative operand.
    #[error("Cannot calculate square root of negative number")]
    NegativeSquareRoot,

    /// Result magnitude exceeded `f64::MAX`.
    #[error("Result overflow: number too large")]
    Overflow,

    /// Result was NaN, e.g. a negative base raised to a fractional power.
    #[error("Invalid result: not a finite number")]
    NotFinite,
}
