//! Per-request pipeline context.
//!
//! One context is created per request, mutated in place by each stage, and
//! dropped once the terminal response has been taken out of it. It is never
//! shared between requests.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::execution::ExecutionResult;
use super::plan::Plan;
use super::response::FormattedResponse;
use super::verification::VerificationResult;
use crate::id::generate_request_id;

/// Request parameters: where the operand pair lives and what to do with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineInput {
    pub partition_key: String,
    pub sort_key: String,
    /// Requested operation name; `None` means the registry default
    pub operation: Option<String>,
}

impl PipelineInput {
    pub fn new(partition_key: impl Into<String>, sort_key: impl Into<String>) -> Self {
        Self {
            partition_key: partition_key.into(),
            sort_key: sort_key.into(),
            operation: None,
        }
    }

    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }
}

/// Mutable state for one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineContext {
    pub request_id: String,
    pub task_description: String,
    pub input: PipelineInput,
    pub plan: Option<Plan>,
    pub execution_result: Option<ExecutionResult>,
    pub verification_result: Option<VerificationResult>,
    pub formatted_response: Option<FormattedResponse>,
    pub current_step: String,
    pub error: Option<String>,
    pub retry_count: u32,
    /// Stage name to elapsed milliseconds; a repeated stage keeps its latest timing
    pub node_timings: BTreeMap<String, f64>,
}

impl PipelineContext {
    pub fn new(request_id: impl Into<String>, task_description: impl Into<String>, input: PipelineInput) -> Self {
        Self {
            request_id: request_id.into(),
            task_description: task_description.into(),
            input,
            plan: None,
            execution_result: None,
            verification_result: None,
            formatted_response: None,
            current_step: "start".to_string(),
            error: None,
            retry_count: 0,
            node_timings: BTreeMap::new(),
        }
    }

    /// Context with a fresh correlation id and a generated task description.
    pub fn for_input(input: PipelineInput) -> Self {
        let task = format!(
            "Retrieve val1 and val2 for {} / {} and compute the {} result",
            input.partition_key,
            input.sort_key,
            input.operation.as_deref().unwrap_or("add")
        );
        Self::new(generate_request_id(), task, input)
    }

    pub fn record_timing(&mut self, stage: &str, elapsed_ms: f64) {
        self.node_timings.insert(stage.to_string(), elapsed_ms);
    }

    /// Set the error unless one is already recorded.
    pub fn fail(&mut self, error: impl Into<String>) {
        if self.error.is_none() {
            self.error = Some(error.into());
        }
    }
}
