//! Domain types for verimath
//!
//! This module contains the data model shared by every pipeline stage:
//! - PipelineContext: per-request mutable state
//! - Plan / PlanStep: output of the planning stage
//! - ToolCallResult / ExecutionResult: output of the execution stage
//! - VerificationCheck / VerificationResult: output of the verification stage
//! - FormattedResponse: the client-facing result
//! - LookupRecord: what the data-lookup collaborator returns

pub mod context;
pub mod execution;
pub mod plan;
pub mod record;
pub mod response;
pub mod verification;

pub use context::{PipelineContext, PipelineInput};
pub use execution::{ExecutionResult, QUERY_TOOL, ToolCallResult, ToolOutput};
pub use plan::{Plan, PlanStep, StepKind};
pub use record::LookupRecord;
pub use response::FormattedResponse;
pub use verification::{VerificationCheck, VerificationResult, VerificationStatus};
