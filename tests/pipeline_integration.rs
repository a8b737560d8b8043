//! End-to-end pipeline integration tests
//!
//! Runs the full plan/execute/verify/respond flow against a SQLite pair store
//! on disk, with a scripted LLM client where planning is exercised.

use std::sync::Arc;

use serde_json::json;
use tempfile::TempDir;
use verimath::domain::{LookupRecord, PipelineContext, PipelineInput, StepKind};
use verimath::error::Result;
use verimath::llm::{LlmClient, MockLlmClient};
use verimath::pipeline::{PipelineController, PlanGenerator, RetryLimits, Route};
use verimath::storage::{DataLookup, SqlitePairStore, pair_sort_key, user_partition_key};
use verimath::tools::{Numeric, ToolRegistry};

fn seeded_store(temp: &TempDir, val1: Numeric, val2: Numeric) -> Result<SqlitePairStore> {
    let store = SqlitePairStore::open(temp.path().join("pairs.db"))?;
    store.put(
        &user_partition_key("alice"),
        &pair_sort_key("001"),
        &LookupRecord::from_pair(val1, val2),
    )?;
    Ok(store)
}

fn request(operation: &str) -> PipelineContext {
    PipelineContext::for_input(
        PipelineInput::new(user_partition_key("alice"), pair_sort_key("001")).with_operation(operation),
    )
}

fn controller(store: SqlitePairStore, llm: Option<Arc<dyn LlmClient>>) -> PipelineController {
    let lookup: Arc<dyn DataLookup> = Arc::new(store);
    PipelineController::from_collaborators(lookup, llm, ToolRegistry::new())
}

/// Stored 42/58 with add produces a verified 100
#[tokio::test]
async fn test_addition_end_to_end() -> Result<()> {
    let temp = TempDir::new()?;
    let store = seeded_store(&temp, Numeric::Int(42), Numeric::Int(58))?;
    let run = controller(store, None).run(request("add")).await;

    assert_eq!(run.route, Route::Success);
    assert_eq!(run.retry_count, 0);
    assert!(run.response.success);
    assert_eq!(run.response.data["val1"], json!(42));
    assert_eq!(run.response.data["val2"], json!(58));
    assert_eq!(run.response.data["result"], json!(100));
    assert_eq!(run.response.data["operation"], json!("add"));
    assert_eq!(run.response.data["verification_status"], json!("passed"));
    assert_eq!(run.response.metadata["request_id"], json!(run.request_id));
    assert_eq!(run.node_timings.len(), 4);
    Ok(())
}

/// Division by zero never yields a number; retries run out and the run fails
#[tokio::test]
async fn test_division_by_zero_fails_after_retries() -> Result<()> {
    let temp = TempDir::new()?;
    let store = seeded_store(&temp, Numeric::Int(10), Numeric::Int(0))?;
    let run = controller(store, None).run(request("divide")).await;

    assert_eq!(run.route, Route::Error);
    assert_eq!(run.retry_count, RetryLimits::default().max_execution_retries);
    assert!(!run.response.success);
    assert!(run.response.data.is_empty());
    assert!(run.response.message.starts_with("Error: Execution failed after 3 retries"));
    assert!(run.response.message.contains("Division by zero"));
    Ok(())
}

/// Prose from the planner falls back to the fixed plan using the request's keys
#[tokio::test]
async fn test_prose_plan_falls_back() -> Result<()> {
    let temp = TempDir::new()?;
    let store = seeded_store(&temp, Numeric::Int(3), Numeric::Int(4))?;
    let mock = Arc::new(MockLlmClient::always("I would add the two numbers together."));
    let llm: Arc<dyn LlmClient> = mock.clone();

    let planner = PlanGenerator::new(ToolRegistry::new()).with_llm(llm.clone());
    let ctx = request("add");
    let plan = planner.plan(&ctx).await;
    assert_eq!(plan.steps.len(), 4);
    assert_eq!(plan.steps[0].kind, StepKind::QueryData);
    assert_eq!(plan.steps[0].param_str("pk"), Some("USER#alice"));
    assert_eq!(plan.steps[0].param_str("sk"), Some("PAIR#001"));

    let response = controller(store, Some(llm)).run_pipeline(request("add")).await;
    assert!(response.success);
    assert_eq!(response.data["result"], json!(7));
    assert_eq!(mock.call_count(), 2);
    Ok(())
}

/// Float division is checked within tolerance
#[tokio::test]
async fn test_float_division_verified() -> Result<()> {
    let temp = TempDir::new()?;
    let store = seeded_store(&temp, Numeric::Float(7.5), Numeric::Float(2.5))?;
    let response = controller(store, None).run_pipeline(request("divide")).await;

    assert!(response.success);
    assert_eq!(response.data["result"], json!(3.0));
    assert_eq!(response.data["expression"], json!("7.5 / 2.5 = 3.0"));
    assert_eq!(response.metadata["verification_confidence"], json!(1.0));
    Ok(())
}

/// A missing pair exhausts execution retries with a not-found message
#[tokio::test]
async fn test_missing_pair_reports_not_found() -> Result<()> {
    let temp = TempDir::new()?;
    let store = SqlitePairStore::open(temp.path().join("empty.db"))?;
    let run = controller(store, None)
        .with_retry_limits(RetryLimits {
            max_execution_retries: 1,
            max_verification_retries: 0,
        })
        .run(request("subtract"))
        .await;

    assert_eq!(run.route, Route::Error);
    assert_eq!(run.retry_count, 1);
    assert!(run.response.message.contains("Item not found"));
    Ok(())
}

/// A plan whose last lookup differs from the computed pair fails verification
/// on every attempt and exhausts the verification retries
#[tokio::test]
async fn test_verification_mismatch_exhausts_retries() -> Result<()> {
    let temp = TempDir::new()?;
    let store = seeded_store(&temp, Numeric::Int(2), Numeric::Int(3))?;
    store.put(
        &user_partition_key("alice"),
        &pair_sort_key("002"),
        &LookupRecord::from_pair(Numeric::Int(10), Numeric::Int(20)),
    )?;
    let reply = r#"{"operation": "add", "steps": [
        {"step_number": 1, "action": "query_database", "parameters": {"pk": "USER#alice", "sk": "PAIR#001"}},
        {"step_number": 2, "action": "execute_operation", "depends_on": [1]},
        {"step_number": 3, "action": "query_database", "parameters": {"pk": "USER#alice", "sk": "PAIR#002"}}
    ]}"#;
    let llm: Arc<dyn LlmClient> = Arc::new(MockLlmClient::new(vec![reply.to_string()]));
    let run = controller(store, Some(llm)).run(request("add")).await;

    assert_eq!(run.route, Route::Error);
    assert_eq!(run.retry_count, RetryLimits::default().max_verification_retries);
    assert!(!run.response.success);
    assert_eq!(
        run.response.message,
        "Error: Verification failed after 2 retries: Verification failed: 10 + 20 = 30, but got 5"
    );
    Ok(())
}

/// Keys the model leaves null are taken from the request
#[tokio::test]
async fn test_null_plan_key_uses_request_key() -> Result<()> {
    let temp = TempDir::new()?;
    let store = seeded_store(&temp, Numeric::Int(4), Numeric::Int(5))?;
    let reply = r#"{"operation": "multiply", "steps": [
        {"step_number": 1, "action": "query_database", "parameters": {"pk": null, "sk": "PAIR#001"}},
        {"step_number": 2, "action": "execute_operation", "depends_on": [1]}
    ]}"#;
    let llm: Arc<dyn LlmClient> = Arc::new(MockLlmClient::new(vec![reply.to_string()]));
    let run = controller(store, Some(llm)).run(request("multiply")).await;

    assert_eq!(run.route, Route::Success);
    assert_eq!(run.retry_count, 0);
    assert_eq!(run.response.data["result"], json!(20));
    Ok(())
}

/// A JSON plan from the LLM decides the operation
#[tokio::test]
async fn test_llm_plan_selects_operation() -> Result<()> {
    let temp = TempDir::new()?;
    let store = seeded_store(&temp, Numeric::Int(9), Numeric::Int(4))?;
    let reply = r#"```json
{
    "task_understanding": "Subtract the second value from the first",
    "operation": "subtract",
    "steps": [
        {"step_number": 1, "action": "query_database", "description": "Fetch the pair", "parameters": {}},
        {"step_number": 2, "action": "execute_operation", "description": "Subtract", "depends_on": [1]},
        {"step_number": 3, "action": "verify_result", "depends_on": [1, 2]},
        {"step_number": 4, "action": "format_response", "depends_on": [3]}
    ]
}
```"#;
    let llm: Arc<dyn LlmClient> = Arc::new(MockLlmClient::new(vec![reply.to_string()]));
    let response = controller(store, Some(llm)).run_pipeline(request("add")).await;

    assert!(response.success);
    assert_eq!(response.data["operation"], json!("subtract"));
    assert_eq!(response.data["result"], json!(5));
    assert_eq!(response.message, "Subtract completed successfully");
    Ok(())
}

/// Same stored pair and request give the same response apart from ids
#[tokio::test]
async fn test_repeat_runs_are_stable() -> Result<()> {
    let temp = TempDir::new()?;
    let store = seeded_store(&temp, Numeric::Int(6), Numeric::Int(7))?;
    let controller = controller(store, None);

    let first = controller.run_pipeline(request("multiply")).await;
    let second = controller.run_pipeline(request("multiply")).await;
    assert_eq!(first.data, second.data);
    assert_eq!(first.message, second.message);
    assert_eq!(first.data["result"], json!(42));
    Ok(())
}

/// Pairs survive reopening the database
#[tokio::test]
async fn test_store_persists_across_reopen() -> Result<()> {
    let temp = TempDir::new()?;
    {
        seeded_store(&temp, Numeric::Int(1), Numeric::Float(2.5))?;
    }
    let store = SqlitePairStore::open(temp.path().join("pairs.db"))?;
    let record = store
        .get_item(&user_partition_key("alice"), &pair_sort_key("001"))
        .await?
        .expect("pair should be stored");
    assert_eq!(record.operand("val1"), Some(Numeric::Int(1)));
    assert_eq!(record.operand("val2"), Some(Numeric::Float(2.5)));
    Ok(())
}
