//! Client-facing response shape.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Final response handed back to the caller.
///
/// `data` keys consumed downstream: `val1`, `val2`, `result`, `operation`,
/// `expression`, `verification_status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormattedResponse {
    pub success: bool,
    pub data: Map<String, Value>,
    pub metadata: Map<String, Value>,
    pub message: String,
}

impl FormattedResponse {
    /// Failure response carrying only the request id in its metadata.
    pub fn failure(request_id: &str, message: impl Into<String>) -> Self {
        let mut metadata = Map::new();
        metadata.insert("request_id".to_string(), Value::from(request_id));
        Self {
            success: false,
            data: Map::new(),
            metadata,
            message: message.into(),
        }
    }
}
