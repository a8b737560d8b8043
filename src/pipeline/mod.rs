//! Plan → Execute → Verify → Respond pipeline.
//!
//! Each stage reads and writes one [`PipelineContext`](crate::domain::PipelineContext)
//! and records its own duration in `node_timings`. The
//! [`PipelineController`] sequences the stages and owns retry routing.

mod controller;
mod executor;
mod formatter;
mod planner;
mod verifier;

pub use controller::{PipelineController, PipelineRun, RetryLimits, Route, Stage};
pub use executor::StepExecutor;
pub use formatter::ResponseFormatter;
pub use planner::PlanGenerator;
pub use verifier::ResultVerifier;

use crate::domain::{ExecutionResult, Plan};
use crate::tools::{Operation, ToolRegistry};

/// `node_timings` key for the planning stage.
pub const ORCHESTRATOR_STAGE: &str = "orchestrator";
/// `node_timings` key for the execution stage.
pub const EXECUTION_STAGE: &str = "execution";
/// `node_timings` key for the verification stage.
pub const VERIFICATION_STAGE: &str = "verification";
/// `node_timings` key for the response stage.
pub const RESPONSE_STAGE: &str = "response";

/// Operation an execution actually performed.
///
/// The successful arithmetic call wins; otherwise the plan's declared
/// operation; otherwise the registry default.
pub(crate) fn performed_operation(execution: &ExecutionResult, plan: &Plan, registry: &ToolRegistry) -> Operation {
    if let Some((operation, _)) = execution.arithmetic_result() {
        return operation;
    }
    registry.resolve_operation(plan.declared_operation())
}

#[cfg(test)]
pub(crate) mod testutil {
    //! Fixtures shared by the stage tests.

    use chrono::Utc;
    use serde_json::Map;

    use crate::domain::{
        ExecutionResult, LookupRecord, PipelineContext, PipelineInput, Plan, PlanStep, QUERY_TOOL, StepKind,
        ToolCallResult, ToolOutput,
    };
    use crate::tools::{Numeric, Operation};

    pub fn context(operation: &str) -> PipelineContext {
        PipelineContext::new(
            "req-test",
            "test task",
            PipelineInput::new("USER#alice", "PAIR#001").with_operation(operation),
        )
    }

    pub fn plan(operation: Operation) -> Plan {
        Plan {
            id: "req-test".to_string(),
            created_at: Utc::now(),
            task_description: "test task".to_string(),
            steps: vec![
                PlanStep::new(1, StepKind::QueryData, "query")
                    .with_param("pk", "USER#alice")
                    .with_param("sk", "PAIR#001"),
                PlanStep::new(2, StepKind::ExecuteOperation, "compute")
                    .with_param("operation", operation.as_str())
                    .with_param("function", operation.function_name())
                    .with_depends_on(vec![1]),
                PlanStep::new(3, StepKind::VerifyResult, "verify").with_depends_on(vec![1, 2]),
                PlanStep::new(4, StepKind::FormatResponse, "format").with_depends_on(vec![3]),
            ],
            expected_outcome: "result".to_string(),
        }
    }

    pub fn lookup_call(val1: Numeric, val2: Numeric) -> ToolCallResult {
        ToolCallResult::success(
            QUERY_TOOL,
            Map::new(),
            ToolOutput::Record(LookupRecord::from_pair(val1, val2)),
            0.1,
        )
    }

    pub fn arithmetic_call(operation: Operation, result: Numeric) -> ToolCallResult {
        ToolCallResult::success(operation.function_name(), Map::new(), ToolOutput::Number(result), 0.1)
    }

    /// Execution holding a lookup of `(val1, val2)` and a recorded `result`.
    pub fn execution(operation: Operation, val1: Numeric, val2: Numeric, result: Numeric) -> ExecutionResult {
        ExecutionResult::from_tool_results(
            "req-test",
            vec![1, 2],
            vec![lookup_call(val1, val2), arithmetic_call(operation, result)],
            Some(result),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::testutil::*;
    use super::*;
    use crate::tools::Numeric;

    #[test]
    fn test_performed_operation_prefers_arithmetic_call() {
        let exec = execution(Operation::Multiply, Numeric::Int(2), Numeric::Int(3), Numeric::Int(6));
        let op = performed_operation(&exec, &plan(Operation::Add), &ToolRegistry::new());
        assert_eq!(op, Operation::Multiply);
    }

    #[test]
    fn test_performed_operation_falls_back_to_plan() {
        let exec = ExecutionResult::from_tool_results("req-test", vec![], vec![], None);
        let op = performed_operation(&exec, &plan(Operation::Divide), &ToolRegistry::new());
        assert_eq!(op, Operation::Divide);
    }

    #[test]
    fn test_performed_operation_default() {
        let exec = ExecutionResult::from_tool_results("req-test", vec![], vec![], None);
        let mut bare = plan(Operation::Divide);
        bare.steps.retain(|s| s.param_str("operation").is_none());
        let registry = ToolRegistry::new().with_default_operation(Operation::Subtract);
        assert_eq!(performed_operation(&exec, &bare, &registry), Operation::Subtract);
    }
}
