//! Tool registry: operation names, arithmetic functions and their verifiers.
//!
//! Operations are a closed enum dispatched by exhaustive match. Free-form
//! names coming from plans (either `add` or `add_values`) resolve through
//! [`ResolvedOperation`]; anything unrecognised falls back to the registry's
//! default operation, which is `add` unless configured otherwise.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::numeric::{ArithmeticError, Numeric};

/// Default absolute tolerance for division verification.
pub const DEFAULT_DIVISION_TOLERANCE: f64 = 1e-9;

/// Arithmetic operation supported by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl Operation {
    pub const ALL: [Operation; 4] = [
        Operation::Add,
        Operation::Subtract,
        Operation::Multiply,
        Operation::Divide,
    ];

    /// Operation name as used in requests and plans.
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Add => "add",
            Operation::Subtract => "subtract",
            Operation::Multiply => "multiply",
            Operation::Divide => "divide",
        }
    }

    /// Name of the arithmetic tool implementing this operation.
    pub fn function_name(&self) -> &'static str {
        match self {
            Operation::Add => "add_values",
            Operation::Subtract => "subtract_values",
            Operation::Multiply => "multiply_values",
            Operation::Divide => "divide_values",
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Operation::Add => "+",
            Operation::Subtract => "-",
            Operation::Multiply => "*",
            Operation::Divide => "/",
        }
    }

    /// Noun form, used in verification check names.
    pub fn noun(&self) -> &'static str {
        match self {
            Operation::Add => "addition",
            Operation::Subtract => "subtraction",
            Operation::Multiply => "multiplication",
            Operation::Divide => "division",
        }
    }

    /// Name of the correctness check for this operation.
    pub fn check_name(&self) -> String {
        format!("{}_correctness", self.noun())
    }

    /// Capitalized name for user-facing messages ("Add", "Divide").
    pub fn title(&self) -> &'static str {
        match self {
            Operation::Add => "Add",
            Operation::Subtract => "Subtract",
            Operation::Multiply => "Multiply",
            Operation::Divide => "Divide",
        }
    }

    /// Match an operation or tool function name. Case and surrounding
    /// whitespace are ignored.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|op| name == op.as_str() || name == op.function_name())
    }

    /// Run the arithmetic function for this operation.
    pub fn apply(&self, val1: Numeric, val2: Numeric) -> Result<Numeric, ArithmeticError> {
        match self {
            Operation::Add => Ok(val1.add(val2)),
            Operation::Subtract => Ok(val1.sub(val2)),
            Operation::Multiply => Ok(val1.mul(val2)),
            Operation::Divide => val1.div(val2),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of resolving a free-form operation name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedOperation {
    Known(Operation),
    Unknown(String),
}

impl ResolvedOperation {
    pub fn parse(name: &str) -> Self {
        match Operation::from_name(name) {
            Some(op) => ResolvedOperation::Known(op),
            None => ResolvedOperation::Unknown(name.to_string()),
        }
    }
}

/// Result of a verification tool call.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifyOutcome {
    pub is_valid: bool,
    /// Recomputed value; `None` when it cannot be computed (division by zero)
    pub expected: Option<Numeric>,
    pub actual: Numeric,
    pub message: String,
}

/// Registry of arithmetic and verification tools.
#[derive(Debug, Clone)]
pub struct ToolRegistry {
    default_operation: Operation,
    division_tolerance: f64,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self {
            default_operation: Operation::Add,
            division_tolerance: DEFAULT_DIVISION_TOLERANCE,
        }
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the operation used when a name is missing or unrecognised.
    pub fn with_default_operation(mut self, operation: Operation) -> Self {
        self.default_operation = operation;
        self
    }

    /// Set the absolute tolerance for division verification.
    pub fn with_division_tolerance(mut self, tolerance: f64) -> Self {
        self.division_tolerance = tolerance;
        self
    }

    pub fn default_operation(&self) -> Operation {
        self.default_operation
    }

    pub fn division_tolerance(&self) -> f64 {
        self.division_tolerance
    }

    /// Resolve an optional operation name, applying the lenient default.
    pub fn resolve_operation(&self, name: Option<&str>) -> Operation {
        match name.map(ResolvedOperation::parse) {
            Some(ResolvedOperation::Known(op)) => op,
            Some(ResolvedOperation::Unknown(name)) => {
                tracing::debug!(
                    operation = %name,
                    default = %self.default_operation,
                    "Unknown operation, using default"
                );
                self.default_operation
            }
            None => self.default_operation,
        }
    }

    /// Run an arithmetic tool.
    pub fn execute(&self, operation: Operation, val1: Numeric, val2: Numeric) -> Result<Numeric, ArithmeticError> {
        operation.apply(val1, val2)
    }

    /// Run the verification tool for `operation` against a recorded result.
    ///
    /// Add, subtract and multiply require exact equality. Divide compares
    /// within the registry's tolerance and always fails on a zero divisor.
    pub fn verify(&self, operation: Operation, val1: Numeric, val2: Numeric, result: Numeric) -> VerifyOutcome {
        let symbol = operation.symbol();
        let expected = match operation.apply(val1, val2) {
            Ok(expected) => expected,
            Err(_) => {
                return VerifyOutcome {
                    is_valid: false,
                    expected: None,
                    actual: result,
                    message: "Verification failed: Division by zero is undefined".to_string(),
                };
            }
        };

        let is_valid = match operation {
            Operation::Divide => (expected.as_f64() - result.as_f64()).abs() <= self.division_tolerance,
            Operation::Add | Operation::Subtract | Operation::Multiply => expected == result,
        };

        let message = if is_valid {
            format!("Verification passed: {} {} {} = {}", val1, symbol, val2, result)
        } else {
            format!(
                "Verification failed: {} {} {} = {}, but got {}",
                val1, symbol, val2, expected, result
            )
        };

        VerifyOutcome {
            is_valid,
            expected: Some(expected),
            actual: result,
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_name_accepts_operation_and_function_names() {
        assert_eq!(Operation::from_name("add"), Some(Operation::Add));
        assert_eq!(Operation::from_name("add_values"), Some(Operation::Add));
        assert_eq!(Operation::from_name(" Divide "), Some(Operation::Divide));
        assert_eq!(Operation::from_name("subtract_values"), Some(Operation::Subtract));
        assert_eq!(Operation::from_name("modulo"), None);
    }

    #[test]
    fn test_operation_names() {
        assert_eq!(Operation::Multiply.as_str(), "multiply");
        assert_eq!(Operation::Multiply.function_name(), "multiply_values");
        assert_eq!(Operation::Multiply.check_name(), "multiplication_correctness");
        assert_eq!(Operation::Subtract.symbol(), "-");
        assert_eq!(Operation::Divide.title(), "Divide");
    }

    #[test]
    fn test_operation_serde() {
        assert_eq!(serde_json::to_string(&Operation::Divide).unwrap(), "\"divide\"");
        let op: Operation = serde_json::from_str("\"subtract\"").unwrap();
        assert_eq!(op, Operation::Subtract);
    }

    #[test]
    fn test_resolved_operation() {
        assert_eq!(ResolvedOperation::parse("multiply"), ResolvedOperation::Known(Operation::Multiply));
        assert_eq!(
            ResolvedOperation::parse("power"),
            ResolvedOperation::Unknown("power".to_string())
        );
    }

    #[test]
    fn test_resolve_operation_defaults_to_add() {
        let registry = ToolRegistry::new();
        assert_eq!(registry.resolve_operation(None), Operation::Add);
        assert_eq!(registry.resolve_operation(Some("power")), Operation::Add);
        assert_eq!(registry.resolve_operation(Some("divide_values")), Operation::Divide);
    }

    #[test]
    fn test_resolve_operation_custom_default() {
        let registry = ToolRegistry::new().with_default_operation(Operation::Multiply);
        assert_eq!(registry.resolve_operation(Some("???")), Operation::Multiply);
    }

    #[test]
    fn test_function_names() {
        let names: Vec<&str> = Operation::ALL.iter().map(|op| op.function_name()).collect();
        assert_eq!(names, vec!["add_values", "subtract_values", "multiply_values", "divide_values"]);
    }

    #[test]
    fn test_execute_divide_by_zero_is_error() {
        let registry = ToolRegistry::new();
        let result = registry.execute(Operation::Divide, Numeric::Int(10), Numeric::Int(0));
        assert_eq!(result, Err(ArithmeticError::DivisionByZero));
    }

    #[test]
    fn test_verify_exact_operations() {
        let registry = ToolRegistry::new();
        for (op, a, b) in [
            (Operation::Add, 42, 58),
            (Operation::Subtract, 10, 25),
            (Operation::Multiply, -3, 14),
        ] {
            let correct = op.apply(Numeric::Int(a), Numeric::Int(b)).unwrap();
            let ok = registry.verify(op, Numeric::Int(a), Numeric::Int(b), correct);
            assert!(ok.is_valid, "{} should verify", op);
            assert_eq!(ok.expected, Some(correct));

            let wrong = correct.add(Numeric::Int(1));
            let bad = registry.verify(op, Numeric::Int(a), Numeric::Int(b), wrong);
            assert!(!bad.is_valid, "{} should reject off-by-one", op);
            assert!(bad.message.contains("but got"));
        }
    }

    #[test]
    fn test_verify_add_message() {
        let outcome = ToolRegistry::new().verify(Operation::Add, Numeric::Int(42), Numeric::Int(58), Numeric::Int(100));
        assert_eq!(outcome.message, "Verification passed: 42 + 58 = 100");
    }

    #[test]
    fn test_verify_division_tolerance() {
        let registry = ToolRegistry::new();
        let ok = registry.verify(Operation::Divide, Numeric::Float(7.5), Numeric::Float(2.5), Numeric::Float(3.0));
        assert!(ok.is_valid);

        let near = registry.verify(Operation::Divide, Numeric::Int(1), Numeric::Int(3), Numeric::Float(1.0 / 3.0 + 1e-10));
        assert!(near.is_valid);

        let far = registry.verify(Operation::Divide, Numeric::Int(1), Numeric::Int(3), Numeric::Float(0.3334));
        assert!(!far.is_valid);
    }

    #[test]
    fn test_verify_division_by_zero_fails_without_expected() {
        let outcome = ToolRegistry::new().verify(Operation::Divide, Numeric::Int(10), Numeric::Int(0), Numeric::Int(100));
        assert!(!outcome.is_valid);
        assert!(outcome.expected.is_none());
        assert!(outcome.message.contains("Division by zero"));
    }

    #[test]
    fn test_custom_division_tolerance() {
        let registry = ToolRegistry::new().with_division_tolerance(0.01);
        let outcome = registry.verify(Operation::Divide, Numeric::Int(1), Numeric::Int(3), Numeric::Float(0.335));
        assert!(outcome.is_valid);
    }
}
