//! Operation registry for dispatching requests by operation name.
//!
//! The registry maps a case-sensitive operation name to its arity and a pure
//! numeric function. It is filled once at startup and then shared read-only
//! (behind an `Arc`) by every connection task, so no locking is needed.
//!
//! # Example
//!
//! ```
//! use calcwire::ops::{MathError, OperationRegistry};
//!
//! let mut registry = OperationRegistry::standard();
//! registry.register("NEG", 1, |operands| Ok(-operands[0]));
//!
//! assert_eq!(registry.get("NEG").map(|op| op.arity()), Some(1));
//! assert_eq!(registry.get("DIV").unwrap().evaluate(&[1.0, 0.0]), Err(MathError::DivisionByZero));
//! ```

use std::collections::HashMap;

use super::arithmetic;
use super::MathError;
use crate::protocol::Request;

/// Outcome of evaluating a validated request.
pub type DispatchOutcome = Result<f64, MathError>;

/// Numeric function of an operation.
///
/// Receives exactly `arity` operands.
pub type Evaluate = fn(&[f64]) -> DispatchOutcome;

/// A registered operation.
#[derive(Debug, Clone)]
pub struct OperationSpec {
    name: String,
    arity: usize,
    evaluate: Evaluate,
}

impl OperationSpec {
    /// Operation name as matched on the wire.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of operands the operation requires.
    #[inline]
    pub fn arity(&self) -> usize {
        self.arity
    }

    /// Run the numeric function.
    ///
    /// # Panics
    ///
    /// Panics if `operands.len()` is smaller than the arity. Requests built by
    /// the parser always match.
    #[inline]
    pub fn evaluate(&self, operands: &[f64]) -> DispatchOutcome {
        (self.evaluate)(operands)
    }
}

/// Registry mapping operation names to their specs.
#[derive(Debug, Clone, Default)]
pub struct OperationRegistry {
    operations: HashMap<String, OperationSpec>,
}

impl OperationRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the CalcProtocol/1.0 operations:
    /// ADD, SUB, MUL, DIV, POW (arity 2) and SQRT (arity 1).
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.register("ADD", 2, arithmetic::add);
        registry.register("SUB", 2, arithmetic::sub);
        registry.register("MUL", 2, arithmetic::mul);
        registry.register("DIV", 2, arithmetic::div);
        registry.register("POW", 2, arithmetic::pow);
        registry.register("SQRT", 1, arithmetic::sqrt);
        registry
    }

    /// Register an operation, replacing any existing one with the same name.
    pub fn register(&mut self, name: &str, arity: usize, evaluate: Evaluate) {
        self.operations.insert(
            name.to_string(),
            OperationSpec {
                name: name.to_string(),
                arity,
                evaluate,
            },
        );
    }

    /// Look up an operation by exact name.
    pub fn get(&self, name: &str) -> Option<&OperationSpec> {
        self.operations.get(name)
    }

    /// Whether `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.operations.contains_key(name)
    }

    /// Registered operation names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.operations.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of registered operations.
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Dispatch a validated request to its operation.
    ///
    /// Returns `None` if this registry has no operation of that name and
    /// arity, which only happens for requests validated against another
    /// registry.
    pub fn dispatch(&self, request: &Request) -> Option<DispatchOutcome> {
        let spec = self.get(request.operation())?;
        if spec.arity != request.operands().len() {
            return None;
        }
        Some(spec.evaluate(request.operands()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::parse_request;

    #[test]
    fn test_standard_operations() {
        let registry = OperationRegistry::standard();

        assert_eq!(registry.len(), 6);
        assert_eq!(
            registry.names(),
            vec!["ADD", "DIV", "MUL", "POW", "SQRT", "SUB"]
        );
        for name in ["ADD", "SUB", "MUL", "DIV", "POW"] {
            assert_eq!(registry.get(name).unwrap().arity(), 2);
        }
        assert_eq!(registry.get("SQRT").unwrap().arity(), 1);
    }

    #[test]
    fn test_lookup_is_case_sensitive() {
        let registry = OperationRegistry::standard();

        assert!(registry.contains("ADD"));
        assert!(!registry.contains("add"));
        assert!(!registry.contains("Add"));
    }

    #[test]
    fn test_empty_registry() {
        let registry = OperationRegistry::new();

        assert!(registry.is_empty());
        assert!(registry.get("ADD").is_none());
    }

    #[test]
    fn test_register_extends_without_touching_dispatch() {
        let mut registry = OperationRegistry::standard();
        registry.register("MOD", 2, |operands| {
            if operands[1] == 0.0 {
                Err(MathError::DivisionByZero)
            } else {
                Ok(operands[0] % operands[1])
            }
        });

        let request = parse_request(&registry, "MOD 10 3").unwrap();
        assert_eq!(registry.dispatch(&request), Some(Ok(1.0)));
    }

    #[test]
    fn test_register_replaces() {
        let mut registry = OperationRegistry::standard();
        registry.register("ADD", 1, |operands| Ok(operands[0]));

        assert_eq!(registry.len(), 6);
        assert_eq!(registry.get("ADD").unwrap().arity(), 1);
    }

    #[test]
    fn test_dispatch() {
        let registry = OperationRegistry::standard();

        let request = parse_request(&registry, "ADD 15 25").unwrap();
        assert_eq!(registry.dispatch(&request), Some(Ok(40.0)));

        let request = parse_request(&registry, "DIV 5 0").unwrap();
        assert_eq!(
            registry.dispatch(&request),
            Some(Err(MathError::DivisionByZero))
        );
    }

    #[test]
    fn test_huge_operands_overflow() {
        let registry = OperationRegistry::standard();
        let big = "9".repeat(400);

        for line in [
            format!("SUB {big} {big}"),
            format!("MUL 0 {big}"),
            format!("DIV 1 {big}"),
            format!("ADD {big} -{big}"),
            format!("POW {big} 0"),
            format!("SQRT {big}"),
        ] {
            let request = parse_request(&registry, &line).unwrap();
            assert_eq!(
                registry.dispatch(&request),
                Some(Err(MathError::Overflow)),
                "{line}"
            );
        }

        let request = parse_request(&registry, &format!("DIV {big} 0")).unwrap();
        assert_eq!(
            registry.dispatch(&request),
            Some(Err(MathError::DivisionByZero))
        );
    }

    #[test]
    fn test_dispatch_against_foreign_registry() {
        let mut custom = OperationRegistry::new();
        custom.register("TWICE", 1, |operands| Ok(operands[0] * 2.0));
        let request = parse_request(&custom, "TWICE 4").unwrap();

        let standard = OperationRegistry::standard();
        assert_eq!(standard.dispatch(&request), None);
    }
}
