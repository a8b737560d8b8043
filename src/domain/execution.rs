//! Execution records: one entry per tool call, aggregated per plan run.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::record::LookupRecord;
use crate::tools::{Numeric, Operation};

/// Tool name recorded for data-lookup calls.
pub const QUERY_TOOL: &str = "query_data";

/// Output of a tool call.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolOutput {
    Record(LookupRecord),
    Number(Numeric),
    #[default]
    None,
}

/// Result of a single tool call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallResult {
    pub tool_name: String,
    pub input: Map<String, Value>,
    pub output: ToolOutput,
    pub success: bool,
    pub error: Option<String>,
    pub elapsed_ms: f64,
}

impl ToolCallResult {
    /// Create a successful tool result
    pub fn success(tool_name: impl Into<String>, input: Map<String, Value>, output: ToolOutput, elapsed_ms: f64) -> Self {
        Self {
            tool_name: tool_name.into(),
            input,
            output,
            success: true,
            error: None,
            elapsed_ms,
        }
    }

    /// Create a failed tool result
    pub fn failure(
        tool_name: impl Into<String>,
        input: Map<String, Value>,
        error: impl Into<String>,
        elapsed_ms: f64,
    ) -> Self {
        Self {
            tool_name: tool_name.into(),
            input,
            output: ToolOutput::None,
            success: false,
            error: Some(error.into()),
            elapsed_ms,
        }
    }

    pub fn is_lookup(&self) -> bool {
        self.tool_name == QUERY_TOOL
    }

    /// Operation performed, for arithmetic tool calls.
    pub fn operation(&self) -> Option<Operation> {
        if self.is_lookup() {
            return None;
        }
        Operation::from_name(&self.tool_name)
    }

    pub fn record(&self) -> Option<&LookupRecord> {
        match &self.output {
            ToolOutput::Record(record) => Some(record),
            _ => None,
        }
    }

    pub fn number(&self) -> Option<Numeric> {
        match self.output {
            ToolOutput::Number(n) => Some(n),
            _ => None,
        }
    }
}

/// Aggregate result of executing a plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub plan_id: String,
    pub executed_steps: Vec<u32>,
    pub tool_results: Vec<ToolCallResult>,
    pub final_value: Option<Numeric>,
    /// True iff at least one tool ran and every tool succeeded
    pub success: bool,
    pub error_details: Option<String>,
}

impl ExecutionResult {
    /// Build a result, deriving `success` and `error_details` from the tool calls.
    pub fn from_tool_results(
        plan_id: impl Into<String>,
        executed_steps: Vec<u32>,
        tool_results: Vec<ToolCallResult>,
        final_value: Option<Numeric>,
    ) -> Self {
        let success = !tool_results.is_empty() && tool_results.iter().all(|r| r.success);
        let error_details = if tool_results.is_empty() {
            Some("No tools were executed".to_string())
        } else {
            let errors: Vec<String> = tool_results
                .iter()
                .filter_map(|r| r.error.as_ref().map(|e| format!("{}: {}", r.tool_name, e)))
                .collect();
            if errors.is_empty() { None } else { Some(errors.join("; ")) }
        };

        Self {
            plan_id: plan_id.into(),
            executed_steps,
            tool_results,
            final_value,
            success,
            error_details,
        }
    }

    /// Latest successful lookup record.
    pub fn lookup_record(&self) -> Option<&LookupRecord> {
        self.tool_results
            .iter()
            .rev()
            .filter(|r| r.is_lookup() && r.success)
            .find_map(|r| r.record())
    }

    /// Latest successful arithmetic call, with the operation it performed.
    pub fn arithmetic_result(&self) -> Option<(Operation, Numeric)> {
        self.tool_results
            .iter()
            .rev()
            .filter(|r| r.success)
            .find_map(|r| Some((r.operation()?, r.number()?)))
    }
}
