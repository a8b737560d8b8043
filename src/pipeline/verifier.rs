//! Verification stage: recompute the recorded arithmetic and compare.

use std::time::Instant;

use serde_json::Value;

use super::{VERIFICATION_STAGE, performed_operation};
use crate::domain::{ExecutionResult, PipelineContext, Plan, VerificationCheck, VerificationResult, VerificationStatus};
use crate::id::elapsed_ms;
use crate::tools::ToolRegistry;

/// Checks an execution against the arithmetic it claims to have done.
pub struct ResultVerifier {
    registry: ToolRegistry,
}

impl ResultVerifier {
    pub fn new(registry: ToolRegistry) -> Self {
        Self { registry }
    }

    /// Stage entry: verify the context's execution and record timing.
    pub fn run(&self, ctx: &mut PipelineContext) {
        let start = Instant::now();
        match (&ctx.execution_result, &ctx.plan) {
            (Some(execution), Some(plan)) => {
                let result = self.verify(execution, plan);
                tracing::info!(
                    request_id = %ctx.request_id,
                    status = result.overall_status.as_str(),
                    checks = result.checks.len(),
                    "Verification finished"
                );
                ctx.verification_result = Some(result);
                ctx.current_step = "verification_complete".to_string();
            }
            _ => {
                ctx.fail("Missing execution result or plan for verification");
                ctx.current_step = "verification_failed".to_string();
            }
        }
        ctx.record_timing(VERIFICATION_STAGE, elapsed_ms(start));
    }

    pub fn verify(&self, execution: &ExecutionResult, plan: &Plan) -> VerificationResult {
        let operation = performed_operation(execution, plan, &self.registry);
        let operands = execution.lookup_record().and_then(|r| r.operands().ok());
        let recorded = execution.arithmetic_result().map(|(_, value)| value);

        let checks = match (operands, recorded) {
            (Some((val1, val2)), Some(result)) => {
                let outcome = self.registry.verify(operation, val1, val2, result);
                vec![
                    VerificationCheck::new(
                        operation.check_name(),
                        outcome.expected.map(|e| e.to_value()).unwrap_or(Value::Null),
                        result.to_value(),
                        if outcome.is_valid {
                            VerificationStatus::Passed
                        } else {
                            VerificationStatus::Failed
                        },
                        outcome.message,
                    ),
                    VerificationCheck::new(
                        "type_consistency",
                        Value::from("number"),
                        Value::from(result.type_name()),
                        VerificationStatus::Passed,
                        "Result type is valid",
                    ),
                ]
            }
            _ => vec![VerificationCheck::new(
                "data_availability",
                Value::from("complete data"),
                Value::from("missing data"),
                VerificationStatus::Failed,
                "Required data not available for verification",
            )],
        };

        VerificationResult::from_checks(plan.id.clone(), checks, operation.as_str())
    }
}
