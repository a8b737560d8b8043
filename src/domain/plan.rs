//! Plans produced by the planning stage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Kind of work a plan step describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    QueryData,
    ExecuteOperation,
    VerifyResult,
    FormatResponse,
}

impl StepKind {
    /// Action string used in LLM plans.
    pub fn as_action(&self) -> &'static str {
        match self {
            StepKind::QueryData => "query_database",
            StepKind::ExecuteOperation => "execute_operation",
            StepKind::VerifyResult => "verify_result",
            StepKind::FormatResponse => "format_response",
        }
    }

    /// Parse an action string from an LLM plan.
    ///
    /// Unrecognised actions are treated as `ExecuteOperation`.
    pub fn from_action(action: &str) -> Self {
        match action.trim().to_ascii_lowercase().as_str() {
            "query_database" | "query_data" | "query_dynamodb" => StepKind::QueryData,
            "verify_result" => StepKind::VerifyResult,
            "format_response" => StepKind::FormatResponse,
            "execute_operation" | "execute_function" => StepKind::ExecuteOperation,
            other => {
                tracing::debug!(action = %other, "Unknown plan action, treating as execute_operation");
                StepKind::ExecuteOperation
            }
        }
    }
}

/// A single step of a plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanStep {
    /// 1-based, unique within a plan
    pub step_number: u32,
    pub kind: StepKind,
    pub description: String,
    pub parameters: Map<String, Value>,
    /// Earlier steps this one relies on. Carried, not enforced.
    pub depends_on: Vec<u32>,
}

impl PlanStep {
    pub fn new(step_number: u32, kind: StepKind, description: impl Into<String>) -> Self {
        Self {
            step_number,
            kind,
            description: description.into(),
            parameters: Map::new(),
            depends_on: Vec::new(),
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    pub fn with_depends_on(mut self, depends_on: Vec<u32>) -> Self {
        self.depends_on = depends_on;
        self
    }

    /// String-valued parameter.
    pub fn param_str(&self, key: &str) -> Option<&str> {
        self.parameters.get(key).and_then(|v| v.as_str())
    }
}

/// An ordered plan for one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    /// Same as the request's correlation id
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub task_description: String,
    pub steps: Vec<PlanStep>,
    pub expected_outcome: String,
}

impl Plan {
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// Operation named by the first step that declares one.
    pub fn declared_operation(&self) -> Option<&str> {
        self.steps.iter().find_map(|s| s.param_str("operation"))
    }

    pub fn kinds(&self) -> Vec<StepKind> {
        self.steps.iter().map(|s| s.kind).collect()
    }
}
