//! Execution stage: runs plan steps against the pair store and the tool registry.

use std::sync::Arc;
use std::time::Instant;

use serde_json::{Map, Value};

use super::EXECUTION_STAGE;
use crate::domain::{
    ExecutionResult, LookupRecord, PipelineContext, Plan, PlanStep, QUERY_TOOL, StepKind, ToolCallResult, ToolOutput,
};
use crate::id::elapsed_ms;
use crate::storage::DataLookup;
use crate::tools::{Operation, ToolRegistry};

/// Executes plan steps in plan order.
///
/// `depends_on` is not consulted. Verify and format steps are left to later
/// stages.
pub struct StepExecutor {
    lookup: Arc<dyn DataLookup>,
    registry: ToolRegistry,
}

impl StepExecutor {
    pub fn new(lookup: Arc<dyn DataLookup>, registry: ToolRegistry) -> Self {
        Self { lookup, registry }
    }

    /// Stage entry: execute the context's plan and record timing.
    pub async fn run(&self, ctx: &mut PipelineContext) {
        let start = Instant::now();
        match &ctx.plan {
            Some(plan) => {
                let result = self.execute(plan).await;
                tracing::info!(
                    request_id = %ctx.request_id,
                    tools = result.tool_results.len(),
                    success = result.success,
                    "Plan executed"
                );
                ctx.execution_result = Some(result);
                ctx.current_step = "execution_complete".to_string();
            }
            None => {
                ctx.execution_result = None;
                ctx.fail("No plan available for execution");
                ctx.current_step = "execution_failed".to_string();
            }
        }
        ctx.record_timing(EXECUTION_STAGE, elapsed_ms(start));
    }

    /// Execute `plan` from scratch.
    pub async fn execute(&self, plan: &Plan) -> ExecutionResult {
        let mut executed_steps = Vec::new();
        let mut tool_results = Vec::new();
        let mut cached: Option<LookupRecord> = None;
        let mut final_value = None;

        for step in &plan.steps {
            match step.kind {
                StepKind::QueryData => {
                    executed_steps.push(step.step_number);
                    let result = self.query(step, &mut cached).await;
                    tool_results.push(result);
                }
                StepKind::ExecuteOperation => {
                    let operation = self.step_operation(step);
                    let Some(record) = cached.as_ref() else {
                        tracing::debug!(
                            step = step.step_number,
                            operation = %operation,
                            "No lookup result cached, skipping operation step"
                        );
                        continue;
                    };
                    executed_steps.push(step.step_number);
                    let result = self.compute(operation, record);
                    if let Some(value) = result.number() {
                        final_value = Some(value);
                    }
                    tool_results.push(result);
                }
                StepKind::VerifyResult | StepKind::FormatResponse => {}
            }
        }

        ExecutionResult::from_tool_results(plan.id.clone(), executed_steps, tool_results, final_value)
    }

    /// Operation named by a step's `operation` or `function` parameter.
    fn step_operation(&self, step: &PlanStep) -> Operation {
        let named = step.param_str("operation").or_else(|| step.param_str("function"));
        ["operation", "function"]
            .iter()
            .filter_map(|key| step.param_str(key))
            .find_map(Operation::from_name)
            .unwrap_or_else(|| self.registry.resolve_operation(named))
    }

    async fn query(&self, step: &PlanStep, cached: &mut Option<LookupRecord>) -> ToolCallResult {
        let start = Instant::now();
        let pk = step.param_str("pk").or_else(|| step.param_str("partition_key"));
        let sk = step.param_str("sk").or_else(|| step.param_str("sort_key"));

        let (Some(pk), Some(sk)) = (pk, sk) else {
            return ToolCallResult::failure(
                QUERY_TOOL,
                step.parameters.clone(),
                "Missing pk or sk parameter",
                elapsed_ms(start),
            );
        };

        let mut input = Map::new();
        input.insert("pk".to_string(), Value::from(pk));
        input.insert("sk".to_string(), Value::from(sk));

        match self.lookup.get_item(pk, sk).await {
            Ok(Some(record)) => {
                *cached = Some(record.clone());
                ToolCallResult::success(QUERY_TOOL, input, ToolOutput::Record(record), elapsed_ms(start))
            }
            Ok(None) => {
                tracing::warn!(pk = %pk, sk = %sk, "Item not found");
                *cached = None;
                ToolCallResult::failure(QUERY_TOOL, input, "Item not found", elapsed_ms(start))
            }
            Err(e) => {
                tracing::error!(pk = %pk, sk = %sk, error = %e, "Lookup failed");
                ToolCallResult::failure(QUERY_TOOL, input, e.to_string(), elapsed_ms(start))
            }
        }
    }

    fn compute(&self, operation: Operation, record: &LookupRecord) -> ToolCallResult {
        let start = Instant::now();
        let mut input = Map::new();
        input.insert("val1".to_string(), record.get("val1").cloned().unwrap_or(Value::Null));
        input.insert("val2".to_string(), record.get("val2").cloned().unwrap_or(Value::Null));

        let outcome = record
            .operands()
            .and_then(|(val1, val2)| self.registry.execute(operation, val1, val2));

        match outcome {
            Ok(value) => ToolCallResult::success(
                operation.function_name(),
                input,
                ToolOutput::Number(value),
                elapsed_ms(start),
            ),
            Err(e) => {
                tracing::error!(operation = %operation, error = %e, "Calculation failed");
                ToolCallResult::failure(operation.function_name(), input, e.to_string(), elapsed_ms(start))
            }
        }
    }
}
