//! Lookup records returned by the data-lookup collaborator.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::tools::{ArithmeticError, Numeric};

/// A stored item. Usable as operands when it carries numeric `val1` and `val2`;
/// any other attributes are carried through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LookupRecord(Map<String, Value>);

impl LookupRecord {
    /// Build a record holding just an operand pair.
    pub fn from_pair(val1: Numeric, val2: Numeric) -> Self {
        let mut fields = Map::new();
        fields.insert("val1".to_string(), val1.to_value());
        fields.insert("val2".to_string(), val2.to_value());
        Self(fields)
    }

    /// Add or replace an attribute.
    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.0.insert(key.into(), value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Numeric attribute, if present and a number.
    pub fn operand(&self, key: &str) -> Option<Numeric> {
        self.0.get(key).and_then(Numeric::from_value)
    }

    /// The `val1`/`val2` operand pair.
    pub fn operands(&self) -> Result<(Numeric, Numeric), ArithmeticError> {
        match (self.operand("val1"), self.operand("val2")) {
            (Some(val1), Some(val2)) => Ok((val1, val2)),
            _ => Err(ArithmeticError::MissingOperands),
        }
    }
}
