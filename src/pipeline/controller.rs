//! Pipeline controller: the Orchestrate → Execute → Verify → Respond state machine.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use super::{PlanGenerator, ResponseFormatter, ResultVerifier, StepExecutor};
use crate::domain::{FormattedResponse, PipelineContext};
use crate::llm::LlmClient;
use crate::storage::DataLookup;
use crate::tools::ToolRegistry;

/// Pipeline states. `Respond` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Orchestrate,
    Execute,
    Verify,
    Respond,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Orchestrate => "orchestrate",
            Stage::Execute => "execute",
            Stage::Verify => "verify",
            Stage::Respond => "respond",
        };
        f.write_str(name)
    }
}

/// How a run reached `Respond`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    Success,
    Error,
}

/// Retry bounds. Both share the context's single `retry_count`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryLimits {
    /// Execute → Execute allowed while `retry_count` is below this
    pub max_execution_retries: u32,
    /// Verify → Execute allowed while `retry_count` is below this
    pub max_verification_retries: u32,
}

impl Default for RetryLimits {
    fn default() -> Self {
        Self {
            max_execution_retries: 3,
            max_verification_retries: 2,
        }
    }
}

/// Summary of one finished run.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineRun {
    pub request_id: String,
    pub response: FormattedResponse,
    pub node_timings: BTreeMap<String, f64>,
    pub retry_count: u32,
    pub route: Route,
}

/// Sequences the four stages for one request at a time per call.
///
/// Holds no per-request state, so one controller can serve concurrent runs.
pub struct PipelineController {
    planner: PlanGenerator,
    executor: StepExecutor,
    verifier: ResultVerifier,
    formatter: ResponseFormatter,
    limits: RetryLimits,
}

impl PipelineController {
    pub fn new(
        planner: PlanGenerator,
        executor: StepExecutor,
        verifier: ResultVerifier,
        formatter: ResponseFormatter,
    ) -> Self {
        Self {
            planner,
            executor,
            verifier,
            formatter,
            limits: RetryLimits::default(),
        }
    }

    /// Wire every stage from shared collaborators and one registry.
    pub fn from_collaborators(
        lookup: Arc<dyn DataLookup>,
        llm: Option<Arc<dyn LlmClient>>,
        registry: ToolRegistry,
    ) -> Self {
        let mut planner = PlanGenerator::new(registry.clone());
        if let Some(llm) = llm {
            planner = planner.with_llm(llm);
        }
        Self::new(
            planner,
            StepExecutor::new(lookup, registry.clone()),
            ResultVerifier::new(registry.clone()),
            ResponseFormatter::new(registry),
        )
    }

    pub fn with_retry_limits(mut self, limits: RetryLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Run the pipeline to completion. Never fails; errors end up in the response.
    pub async fn run(&self, mut ctx: PipelineContext) -> PipelineRun {
        tracing::info!(
            request_id = %ctx.request_id,
            pk = %ctx.input.partition_key,
            sk = %ctx.input.sort_key,
            "Pipeline started"
        );

        let mut stage = Stage::Orchestrate;
        loop {
            tracing::debug!(request_id = %ctx.request_id, stage = %stage, "Entering stage");
            stage = match stage {
                Stage::Orchestrate => {
                    self.planner.run(&mut ctx).await;
                    self.after_orchestrate(&mut ctx)
                }
                Stage::Execute => {
                    self.executor.run(&mut ctx).await;
                    self.after_execute(&mut ctx)
                }
                Stage::Verify => {
                    self.verifier.run(&mut ctx);
                    self.after_verify(&mut ctx)
                }
                Stage::Respond => {
                    self.formatter.run(&mut ctx);
                    break;
                }
            };
        }

        let route = if ctx.error.is_some() { Route::Error } else { Route::Success };
        let response = ctx.formatted_response.take().unwrap_or_else(|| {
            FormattedResponse::failure(&ctx.request_id, "Incomplete execution - missing required data")
        });

        tracing::info!(
            request_id = %ctx.request_id,
            success = response.success,
            retries = ctx.retry_count,
            route = ?route,
            "Pipeline finished"
        );

        PipelineRun {
            request_id: ctx.request_id,
            response,
            node_timings: ctx.node_timings,
            retry_count: ctx.retry_count,
            route,
        }
    }

    /// Run the pipeline and return only the client-facing response.
    pub async fn run_pipeline(&self, ctx: PipelineContext) -> FormattedResponse {
        self.run(ctx).await.response
    }

    fn after_orchestrate(&self, ctx: &mut PipelineContext) -> Stage {
        if ctx.plan.is_some() && ctx.error.is_none() {
            Stage::Execute
        } else {
            ctx.fail("Planning produced no plan");
            Stage::Respond
        }
    }

    fn after_execute(&self, ctx: &mut PipelineContext) -> Stage {
        let (success, details) = match &ctx.execution_result {
            Some(result) => (result.success, result.error_details.clone()),
            None => {
                ctx.fail("Execution produced no result");
                return Stage::Respond;
            }
        };

        if success {
            return Stage::Verify;
        }

        let details = details.unwrap_or_else(|| "unknown error".to_string());
        if ctx.retry_count < self.limits.max_execution_retries {
            ctx.retry_count += 1;
            tracing::warn!(
                request_id = %ctx.request_id,
                retry = ctx.retry_count,
                error = %details,
                "Execution failed, retrying"
            );
            Stage::Execute
        } else {
            ctx.fail(format!("Execution failed after {} retries: {}", ctx.retry_count, details));
            Stage::Respond
        }
    }

    fn after_verify(&self, ctx: &mut PipelineContext) -> Stage {
        let (passed, failure) = match &ctx.verification_result {
            Some(result) => (
                result.passed(),
                result.first_failure().map(|check| check.message.clone()),
            ),
            None => {
                ctx.fail("Verification produced no result");
                return Stage::Respond;
            }
        };

        if passed {
            return Stage::Respond;
        }

        let failure = failure.unwrap_or_else(|| "no checks ran".to_string());
        if ctx.retry_count < self.limits.max_verification_retries {
            ctx.retry_count += 1;
            tracing::warn!(
                request_id = %ctx.request_id,
                retry = ctx.retry_count,
                check = %failure,
                "Verification failed, re-executing"
            );
            Stage::Execute
        } else {
            ctx.fail(format!(
                "Verification failed after {} retries: {}",
                ctx.retry_count, failure
            ));
            Stage::Respond
        }
    }
}
