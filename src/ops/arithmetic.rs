//! The six built-in CalcProtocol/1.0 operations.
//!
//! Every function receives exactly as many operands as its registered arity;
//! the parser guarantees this before dispatch. Numbers are `f64` and a result
//! that is not finite is reported as a [`MathError`] instead of being sent.

use super::MathError;

/// Map a raw `f64` result to a dispatch outcome.
///
/// Infinity means the exact result exceeded `f64::MAX`.
fn checked(result: f64) -> Result<f64, MathError> {
    if result.is_infinite() {
        Err(MathError::Overflow)
    } else if result.is_nan() {
        Err(MathError::NotFinite)
    } else {
        Ok(result)
    }
}

/// Reject operands that were too large to parse into a finite `f64`.
fn in_range(operands: &[f64]) -> Result<(), MathError> {
    if operands.iter().any(|operand| operand.is_infinite()) {
        Err(MathError::Overflow)
    } else {
        Ok(())
    }
}

pub(crate) fn add(operands: &[f64]) -> Result<f64, MathError> {
    in_range(operands)?;
    checked(operands[0] + operands[1])
}

pub(crate) fn sub(operands: &[f64]) -> Result<f64, MathError> {
    in_range(operands)?;
    checked(operands[0] - operands[1])
}

pub(crate) fn mul(operands: &[f64]) -> Result<f64, MathError> {
    in_range(operands)?;
    checked(operands[0] * operands[1])
}

pub(crate) fn div(operands: &[f64]) -> Result<f64, MathError> {
    // -0.0 == 0.0
    if operands[1] == 0.0 {
        return Err(MathError::DivisionByZero);
    }
    in_range(operands)?;
    checked(operands[0] / operands[1])
}

pub(crate) fn pow(operands: &[f64]) -> Result<f64, MathError> {
    in_range(operands)?;
    checked(operands[0].powf(operands[1]))
}

pub(crate) fn sqrt(operands: &[f64]) -> Result<f64, MathError> {
    if operands[0] < 0.0 {
        return Err(MathError::NegativeSquareRoot);
    }
    in_range(operands)?;
    checked(operands[0].sqrt())
}
