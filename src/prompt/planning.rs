//! Planning prompt: system instructions and the per-request user message.

use serde::Serialize;

use super::render::PromptRenderer;
use crate::error::Result;
use crate::tools::Operation;

const SYSTEM_TEMPLATE: &str = r#"You plan arithmetic over stored value pairs.

Analyze the request and produce a step-by-step plan that a separate executor will follow.

## Available Operations

{{#each operations}}
- **{{name}}**: val1 {{symbol}} val2 (tool `{{function}}`)
{{/each}}

## Plan Format

Respond with a single JSON object and nothing else:

```json
{
    "task_understanding": "Brief description of what the user wants",
    "operation": "{{operation_choices}}",
    "steps": [
        {
            "step_number": 1,
            "action": "query_database",
            "description": "Retrieve val1 and val2 from the pair store",
            "parameters": {"pk": "<partition_key>", "sk": "<sort_key>"},
            "depends_on": []
        },
        {
            "step_number": 2,
            "action": "execute_operation",
            "description": "Perform the calculation",
            "parameters": {"operation": "<operation_name>"},
            "depends_on": [1]
        },
        {
            "step_number": 3,
            "action": "verify_result",
            "description": "Verify the calculation is correct",
            "parameters": {},
            "depends_on": [1, 2]
        },
        {
            "step_number": 4,
            "action": "format_response",
            "description": "Format the final response",
            "parameters": {},
            "depends_on": [3]
        }
    ],
    "expected_outcome": "Description of the expected result"
}
```

## Guidelines

- Always start with a query to retrieve the values
- Include verification as a mandatory step
- If the operation is unclear, use "{{default_operation}}"
"#;

const USER_TEMPLATE: &str = r#"Task: {{task}}

Partition key: {{partition_key}}
Sort key: {{sort_key}}
Requested operation: {{operation}}

Create the execution plan."#;

#[derive(Debug, Clone, Serialize)]
struct OperationInfo {
    name: &'static str,
    symbol: &'static str,
    function: &'static str,
}

/// Values substituted into the planning prompt.
#[derive(Debug, Clone, Serialize)]
pub struct PlanningVars {
    pub task: String,
    pub partition_key: String,
    pub sort_key: String,
    pub operation: String,
    pub default_operation: String,
}

#[derive(Serialize)]
struct SystemVars<'a> {
    operations: Vec<OperationInfo>,
    operation_choices: String,
    default_operation: &'a str,
}

/// Renders the planning prompt pair.
#[derive(Default)]
pub struct PlanningPrompt {
    renderer: PromptRenderer,
}

impl PlanningPrompt {
    pub fn new() -> Self {
        Self::default()
    }

    /// Render `(system, user)` for one request.
    pub fn render(&self, vars: &PlanningVars) -> Result<(String, String)> {
        let operations: Vec<OperationInfo> = Operation::ALL
            .iter()
            .map(|op| OperationInfo {
                name: op.as_str(),
                symbol: op.symbol(),
                function: op.function_name(),
            })
            .collect();
        let operation_choices = Operation::ALL
            .iter()
            .map(|op| op.as_str())
            .collect::<Vec<_>>()
            .join(" | ");

        let system = self.renderer.render_with(
            SYSTEM_TEMPLATE,
            &SystemVars {
                operations,
                operation_choices,
                default_operation: &vars.default_operation,
            },
        )?;
        let user = self.renderer.render_with(USER_TEMPLATE, vars)?;
        Ok((system, user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars() -> PlanningVars {
        PlanningVars {
            task: "Add the pair".to_string(),
            partition_key: "USER#alice".to_string(),
            sort_key: "PAIR#001".to_string(),
            operation: "add".to_string(),
            default_operation: "add".to_string(),
        }
    }

    #[test]
    fn test_system_lists_every_operation() {
        let prompt = PlanningPrompt::new();
        let (system, _) = prompt.render(&vars()).unwrap();
        for op in Operation::ALL {
            assert!(system.contains(op.function_name()), "missing {}", op);
        }
        assert!(system.contains("add | subtract | multiply | divide"));
    }

    #[test]
    fn test_user_message_embeds_keys() {
        let prompt = PlanningPrompt::new();
        let (_, user) = prompt.render(&vars()).unwrap();
        assert!(user.contains("Partition key: USER#alice"));
        assert!(user.contains("Sort key: PAIR#001"));
        assert!(user.contains("Requested operation: add"));
        assert!(user.starts_with("Task: Add the pair"));
    }
}
