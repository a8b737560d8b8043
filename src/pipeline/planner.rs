//! Planning stage.
//!
//! Asks the LLM for a JSON plan and parses it. Any failure on that path
//! (no client, render error, transport error, timeout, unusable output)
//! yields the fixed four-step fallback plan instead, so planning never fails.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use serde_json::{Map, Value};

use super::ORCHESTRATOR_STAGE;
use crate::domain::{PipelineContext, Plan, PlanStep, StepKind};
use crate::error::{Result, VerimathError};
use crate::id::elapsed_ms;
use crate::llm::{CompletionRequest, LlmClient, extract_json_object};
use crate::prompt::{PlanningPrompt, PlanningVars};
use crate::tools::{Operation, ToolRegistry};

pub const DEFAULT_PLANNING_TIMEOUT: Duration = Duration::from_secs(30);

pub const DEFAULT_PLANNING_MAX_TOKENS: u32 = 2048;

const DEFAULT_EXPECTED_OUTCOME: &str = "Calculation result";

/// Produces a [`Plan`] for a request.
pub struct PlanGenerator {
    llm: Option<Arc<dyn LlmClient>>,
    registry: ToolRegistry,
    prompt: PlanningPrompt,
    timeout: Duration,
    max_tokens: u32,
}

impl PlanGenerator {
    /// Planner without an LLM; always produces the fallback plan.
    pub fn new(registry: ToolRegistry) -> Self {
        Self {
            llm: None,
            registry,
            prompt: PlanningPrompt::new(),
            timeout: DEFAULT_PLANNING_TIMEOUT,
            max_tokens: DEFAULT_PLANNING_MAX_TOKENS,
        }
    }

    pub fn with_llm(mut self, llm: Arc<dyn LlmClient>) -> Self {
        self.llm = Some(llm);
        self
    }

    /// Upper bound on one LLM planning call.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn has_llm(&self) -> bool {
        self.llm.is_some()
    }

    /// Stage entry: store a plan in the context and record timing.
    pub async fn run(&self, ctx: &mut PipelineContext) {
        let start = Instant::now();
        let plan = self.plan(ctx).await;
        tracing::info!(
            request_id = %ctx.request_id,
            steps = plan.step_count(),
            "Plan created"
        );
        ctx.plan = Some(plan);
        ctx.current_step = "orchestrator_complete".to_string();
        ctx.record_timing(ORCHESTRATOR_STAGE, elapsed_ms(start));
    }

    /// Build a plan for `ctx`. Never fails.
    pub async fn plan(&self, ctx: &PipelineContext) -> Plan {
        let Some(llm) = &self.llm else {
            return self.fallback_plan(ctx);
        };

        match self.request_plan(llm.as_ref(), ctx).await {
            Ok(plan) => plan,
            Err(e) => {
                tracing::warn!(
                    request_id = %ctx.request_id,
                    model = %llm.model(),
                    error = %e,
                    "LLM planning failed, using fallback plan"
                );
                self.fallback_plan(ctx)
            }
        }
    }

    async fn request_plan(&self, llm: &dyn LlmClient, ctx: &PipelineContext) -> Result<Plan> {
        let requested = self.registry.resolve_operation(ctx.input.operation.as_deref());
        let vars = PlanningVars {
            task: ctx.task_description.clone(),
            partition_key: ctx.input.partition_key.clone(),
            sort_key: ctx.input.sort_key.clone(),
            operation: requested.as_str().to_string(),
            default_operation: self.registry.default_operation().as_str().to_string(),
        };
        let (system, user) = self.prompt.render(&vars)?;
        let request = CompletionRequest::new(system)
            .with_user_message(user)
            .with_max_tokens(self.max_tokens);

        let response = tokio::time::timeout(self.timeout, llm.complete(request))
            .await
            .map_err(|_| VerimathError::Llm(format!("planning timed out after {:?}", self.timeout)))?
            .map_err(|e| VerimathError::Llm(e.to_string()))?;

        self.parse_plan(&response.content, ctx)
    }

    /// Parse model output into a plan for `ctx`.
    pub fn parse_plan(&self, text: &str, ctx: &PipelineContext) -> Result<Plan> {
        let map =
            extract_json_object(text).ok_or_else(|| VerimathError::Plan("no JSON object in model output".to_string()))?;

        let raw_steps = map
            .get("steps")
            .and_then(Value::as_array)
            .filter(|steps| !steps.is_empty())
            .ok_or_else(|| VerimathError::Plan("plan has no steps".to_string()))?;

        let named = map
            .get("operation")
            .and_then(Value::as_str)
            .or(ctx.input.operation.as_deref());
        let operation = self.registry.resolve_operation(named);

        let mut steps = Vec::with_capacity(raw_steps.len());
        for (index, raw) in raw_steps.iter().enumerate() {
            let step = raw
                .as_object()
                .ok_or_else(|| VerimathError::Plan(format!("step {} is not an object", index + 1)))?;
            steps.push(self.parse_step(step, index, operation, ctx));
        }
        steps.sort_by_key(|s| s.step_number);
        if steps.windows(2).any(|pair| pair[0].step_number == pair[1].step_number) {
            return Err(VerimathError::Plan("duplicate step numbers".to_string()));
        }

        let task_description = map
            .get("task_understanding")
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(&ctx.task_description)
            .to_string();
        let expected_outcome = map
            .get("expected_outcome")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_EXPECTED_OUTCOME)
            .to_string();

        Ok(Plan {
            id: ctx.request_id.clone(),
            created_at: Utc::now(),
            task_description,
            steps,
            expected_outcome,
        })
    }

    fn parse_step(
        &self,
        step: &Map<String, Value>,
        index: usize,
        operation: Operation,
        ctx: &PipelineContext,
    ) -> PlanStep {
        let step_number = step
            .get("step_number")
            .and_then(Value::as_u64)
            .and_then(|n| u32::try_from(n).ok())
            .filter(|n| *n >= 1)
            .unwrap_or(index as u32 + 1);
        let kind = StepKind::from_action(step.get("action").and_then(Value::as_str).unwrap_or_default());
        let description = step
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let mut parameters = step
            .get("parameters")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        let depends_on = step
            .get("depends_on")
            .and_then(Value::as_array)
            .map(|deps| {
                deps.iter()
                    .filter_map(Value::as_u64)
                    .filter_map(|n| u32::try_from(n).ok())
                    .collect()
            })
            .unwrap_or_default();

        match kind {
            StepKind::QueryData => {
                fill_key(&mut parameters, "pk", &ctx.input.partition_key);
                fill_key(&mut parameters, "sk", &ctx.input.sort_key);
            }
            StepKind::ExecuteOperation => {
                parameters.insert("operation".to_string(), Value::from(operation.as_str()));
                parameters.insert("function".to_string(), Value::from(operation.function_name()));
            }
            StepKind::VerifyResult | StepKind::FormatResponse => {}
        }

        PlanStep {
            step_number,
            kind,
            description,
            parameters,
            depends_on,
        }
    }

    /// Deterministic four-step plan for the requested operation.
    pub fn fallback_plan(&self, ctx: &PipelineContext) -> Plan {
        let operation = self.registry.resolve_operation(ctx.input.operation.as_deref());

        let steps = vec![
            PlanStep::new(1, StepKind::QueryData, "Query the pair store for val1 and val2")
                .with_param("pk", ctx.input.partition_key.as_str())
                .with_param("sk", ctx.input.sort_key.as_str()),
            PlanStep::new(
                2,
                StepKind::ExecuteOperation,
                format!("{} val1 and val2 from the retrieved item", operation.title()),
            )
            .with_param("operation", operation.as_str())
            .with_param("function", operation.function_name())
            .with_depends_on(vec![1]),
            PlanStep::new(
                3,
                StepKind::VerifyResult,
                format!("Verify the {} result is correct", operation.noun()),
            )
            .with_depends_on(vec![1, 2]),
            PlanStep::new(4, StepKind::FormatResponse, "Format verified result into JSON response")
                .with_depends_on(vec![3]),
        ];

        Plan {
            id: ctx.request_id.clone(),
            created_at: Utc::now(),
            task_description: ctx.task_description.clone(),
            steps,
            expected_outcome: format!(
                "Structured JSON with val1, val2, {} result, and verification status",
                operation.as_str()
            ),
        }
    }
}

/// Use the request's key unless the model supplied a non-empty string.
fn fill_key(parameters: &mut Map<String, Value>, key: &str, fallback: &str) {
    let usable = parameters
        .get(key)
        .and_then(Value::as_str)
        .is_some_and(|v| !v.trim().is_empty());
    if !usable {
        parameters.insert(key.to_string(), Value::from(fallback));
    }
}
