//! Tool System - arithmetic tools, their verifiers, and name resolution

mod numeric;
mod registry;

pub use numeric::{ArithmeticError, Numeric};
pub use registry::{DEFAULT_DIVISION_TOLERANCE, Operation, ResolvedOperation, ToolRegistry, VerifyOutcome};
