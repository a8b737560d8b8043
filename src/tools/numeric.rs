//! Numeric values flowing through the arithmetic tools.
//!
//! Operands keep their integer-ness: integer inputs produce integer results
//! for add/subtract/multiply, division always produces a float.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Errors raised by the arithmetic tools.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArithmeticError {
    #[error("Division by zero is not allowed")]
    DivisionByZero,

    #[error("val1 or val2 not found in lookup record")]
    MissingOperands,
}

/// An integer or floating point number.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Numeric {
    Int(i64),
    Float(f64),
}

impl Numeric {
    /// Read a number out of a JSON value. Non-numbers yield `None`.
    pub fn from_value(value: &Value) -> Option<Self> {
        if let Some(i) = value.as_i64() {
            return Some(Numeric::Int(i));
        }
        value.as_f64().map(Numeric::Float)
    }

    /// Convert to a JSON value. Non-finite floats become `null`.
    pub fn to_value(self) -> Value {
        match self {
            Numeric::Int(i) => Value::from(i),
            Numeric::Float(f) => serde_json::Number::from_f64(f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
        }
    }

    pub fn as_f64(self) -> f64 {
        match self {
            Numeric::Int(i) => i as f64,
            Numeric::Float(f) => f,
        }
    }

    pub fn is_zero(self) -> bool {
        match self {
            Numeric::Int(i) => i == 0,
            Numeric::Float(f) => f == 0.0,
        }
    }

    /// Runtime type name, as reported by the type consistency check.
    pub fn type_name(self) -> &'static str {
        match self {
            Numeric::Int(_) => "int",
            Numeric::Float(_) => "float",
        }
    }

    pub fn add(self, other: Numeric) -> Numeric {
        match (self, other) {
            (Numeric::Int(a), Numeric::Int(b)) => a
                .checked_add(b)
                .map(Numeric::Int)
                .unwrap_or(Numeric::Float(a as f64 + b as f64)),
            (a, b) => Numeric::Float(a.as_f64() + b.as_f64()),
        }
    }

    pub fn sub(self, other: Numeric) -> Numeric {
        match (self, other) {
            (Numeric::Int(a), Numeric::Int(b)) => a
                .checked_sub(b)
                .map(Numeric::Int)
                .unwrap_or(Numeric::Float(a as f64 - b as f64)),
            (a, b) => Numeric::Float(a.as_f64() - b.as_f64()),
        }
    }

    pub fn mul(self, other: Numeric) -> Numeric {
        match (self, other) {
            (Numeric::Int(a), Numeric::Int(b)) => a
                .checked_mul(b)
                .map(Numeric::Int)
                .unwrap_or(Numeric::Float(a as f64 * b as f64)),
            (a, b) => Numeric::Float(a.as_f64() * b.as_f64()),
        }
    }

    pub fn div(self, other: Numeric) -> Result<Numeric, ArithmeticError> {
        if other.is_zero() {
            return Err(ArithmeticError::DivisionByZero);
        }
        Ok(Numeric::Float(self.as_f64() / other.as_f64()))
    }
}

impl PartialEq for Numeric {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Numeric::Int(a), Numeric::Int(b)) => a == b,
            (a, b) => a.as_f64() == b.as_f64(),
        }
    }
}

impl From<i64> for Numeric {
    fn from(value: i64) -> Self {
        Numeric::Int(value)
    }
}

impl From<f64> for Numeric {
    fn from(value: f64) -> Self {
        Numeric::Float(value)
    }
}

impl FromStr for Numeric {
    type Err = String;

    /// Integers parse as `Int`, anything else numeric and finite as `Float`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(i) = s.parse::<i64>() {
            return Ok(Numeric::Int(i));
        }
        match s.parse::<f64>() {
            Ok(x) if x.is_finite() => Ok(Numeric::Float(x)),
            _ => Err(format!("'{}' is not a finite number", s)),
        }
    }
}

impl fmt::Display for Numeric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Numeric::Int(i) => write!(f, "{}", i),
            // Keep a trailing ".0" on whole floats so 3.0 never reads as an int
            Numeric::Float(x) if x.is_finite() && x.fract() == 0.0 && x.abs() < 1e16 => write!(f, "{:.1}", x),
            Numeric::Float(x) => write!(f, "{}", x),
        }
    }
}
