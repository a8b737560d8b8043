//! Response stage: reduce the run into a [`FormattedResponse`].

use std::time::Instant;

use serde_json::{Map, Value};

use super::{RESPONSE_STAGE, performed_operation};
use crate::domain::{FormattedResponse, PipelineContext};
use crate::id::elapsed_ms;
use crate::tools::ToolRegistry;

pub struct ResponseFormatter {
    registry: ToolRegistry,
}

impl ResponseFormatter {
    pub fn new(registry: ToolRegistry) -> Self {
        Self { registry }
    }

    /// Stage entry: store the response in the context and record timing.
    pub fn run(&self, ctx: &mut PipelineContext) {
        let start = Instant::now();
        let response = self.format(ctx);
        tracing::info!(
            request_id = %ctx.request_id,
            success = response.success,
            message = %response.message,
            "Response formatted"
        );
        ctx.formatted_response = Some(response);
        ctx.current_step = "complete".to_string();
        ctx.record_timing(RESPONSE_STAGE, elapsed_ms(start));
    }

    pub fn format(&self, ctx: &PipelineContext) -> FormattedResponse {
        if let Some(error) = &ctx.error {
            return FormattedResponse::failure(&ctx.request_id, format!("Error: {}", error));
        }

        let (Some(plan), Some(execution), Some(verification)) =
            (&ctx.plan, &ctx.execution_result, &ctx.verification_result)
        else {
            return FormattedResponse::failure(&ctx.request_id, "Incomplete execution - missing required data");
        };

        let operation = performed_operation(execution, plan, &self.registry);
        let record = execution.lookup_record();
        let val1 = record.and_then(|r| r.get("val1")).cloned().unwrap_or(Value::Null);
        let val2 = record.and_then(|r| r.get("val2")).cloned().unwrap_or(Value::Null);
        let result = execution.arithmetic_result().map(|(_, value)| value);

        let mut data = Map::new();
        data.insert("val1".to_string(), val1);
        data.insert("val2".to_string(), val2);
        data.insert(
            "result".to_string(),
            result.map(|r| r.to_value()).unwrap_or(Value::Null),
        );
        data.insert("operation".to_string(), Value::from(operation.as_str()));
        if let (Some((a, b)), Some(result)) = (record.and_then(|r| r.operands().ok()), result) {
            data.insert(
                "expression".to_string(),
                Value::from(format!("{} {} {} = {}", a, operation.symbol(), b, result)),
            );
        }
        data.insert(
            "verification_status".to_string(),
            Value::from(verification.overall_status.as_str()),
        );

        let mut metadata = Map::new();
        metadata.insert("request_id".to_string(), Value::from(ctx.request_id.as_str()));
        metadata.insert("plan_id".to_string(), Value::from(plan.id.as_str()));
        metadata.insert("steps_executed".to_string(), Value::from(execution.tool_results.len()));
        metadata.insert(
            "verification_confidence".to_string(),
            Value::from(verification.confidence),
        );
        metadata.insert("verification_checks".to_string(), Value::from(verification.checks.len()));

        let success = verification.passed();
        let message = if success {
            format!("{} completed successfully", operation.title())
        } else {
            format!("{} completed with verification failures", operation.title())
        };

        FormattedResponse {
            success,
            data,
            metadata,
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ExecutionResult, VerificationCheck, VerificationResult, VerificationStatus};
    use crate::pipeline::testutil::{context, execution, lookup_call, plan};
    use crate::tools::{Numeric, Operation};
    use serde_json::json;

    fn formatter() -> ResponseFormatter {
        ResponseFormatter::new(ToolRegistry::new())
    }

    fn verification(status: VerificationStatus) -> VerificationResult {
        VerificationResult::from_checks(
            "req-test",
            vec![VerificationCheck::new("addition_correctness", json!(1), json!(1), status, "m")],
            "add",
        )
    }

    #[test]
    fn test_success_response() {
        let mut ctx = context("add");
        ctx.plan = Some(plan(Operation::Add));
        ctx.execution_result = Some(execution(
            Operation::Add,
            Numeric::Int(42),
            Numeric::Int(58),
            Numeric::Int(100),
        ));
        ctx.verification_result = Some(verification(VerificationStatus::Passed));

        let response = formatter().format(&ctx);
        assert!(response.success);
        assert_eq!(response.message, "Add completed successfully");
        assert_eq!(response.data["val1"], json!(42));
        assert_eq!(response.data["val2"], json!(58));
        assert_eq!(response.data["result"], json!(100));
        assert_eq!(response.data["operation"], json!("add"));
        assert_eq!(response.data["expression"], json!("42 + 58 = 100"));
        assert_eq!(response.data["verification_status"], json!("passed"));
        assert_eq!(response.metadata["request_id"], json!("req-test"));
        assert_eq!(response.metadata["plan_id"], json!("req-test"));
        assert_eq!(response.metadata["steps_executed"], json!(2));
        assert_eq!(response.metadata["verification_confidence"], json!(1.0));
        assert_eq!(response.metadata["verification_checks"], json!(1));
    }

    #[test]
    fn test_verification_failure_message() {
        let mut ctx = context("divide");
        ctx.plan = Some(plan(Operation::Divide));
        ctx.execution_result = Some(execution(
            Operation::Divide,
            Numeric::Float(7.5),
            Numeric::Float(2.5),
            Numeric::Float(3.5),
        ));
        ctx.verification_result = Some(verification(VerificationStatus::Failed));

        let response = formatter().format(&ctx);
        assert!(!response.success);
        assert_eq!(response.message, "Divide completed with verification failures");
        assert_eq!(response.data["expression"], json!("7.5 / 2.5 = 3.5"));
        assert_eq!(response.data["verification_status"], json!("failed"));
    }

    #[test]
    fn test_error_short_circuits() {
        let mut ctx = context("add");
        ctx.plan = Some(plan(Operation::Add));
        ctx.fail("Execution failed after 3 retries");

        let response = formatter().format(&ctx);
        assert!(!response.success);
        assert!(response.data.is_empty());
        assert_eq!(response.message, "Error: Execution failed after 3 retries");
        assert_eq!(response.metadata.len(), 1);
    }

    #[test]
    fn test_incomplete_execution() {
        let mut ctx = context("add");
        ctx.plan = Some(plan(Operation::Add));

        let response = formatter().format(&ctx);
        assert!(!response.success);
        assert!(response.data.is_empty());
        assert_eq!(response.message, "Incomplete execution - missing required data");
    }

    #[test]
    fn test_missing_result_has_no_expression() {
        let mut ctx = context("add");
        ctx.plan = Some(plan(Operation::Add));
        ctx.execution_result = Some(ExecutionResult::from_tool_results(
            "req-test",
            vec![1],
            vec![lookup_call(Numeric::Int(1), Numeric::Int(2))],
            None,
        ));
        ctx.verification_result = Some(verification(VerificationStatus::Failed));

        let response = formatter().format(&ctx);
        assert_eq!(response.data["val1"], json!(1));
        assert_eq!(response.data["result"], Value::Null);
        assert_eq!(response.data["operation"], json!("add"));
        assert!(response.data.get("expression").is_none());
    }

    #[test]
    fn test_run_records_timing() {
        let mut ctx = context("add");
        formatter().run(&mut ctx);
        assert!(ctx.formatted_response.is_some());
        assert!(ctx.node_timings.contains_key(RESPONSE_STAGE));
        assert_eq!(ctx.current_step, "complete");
    }
}
