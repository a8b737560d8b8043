//! Pull a JSON object out of free-form model output.

use serde_json::{Map, Value};

/// Candidate JSON text in `text`, tried in order: a ```json fence, a plain
/// ``` fence, then everything from the first `{` to the last `}`.
pub fn find_json_text(text: &str) -> Option<&str> {
    if let Some(body) = fenced_block(text, "```json") {
        return Some(body);
    }
    if let Some(body) = fenced_block(text, "```") {
        return Some(body);
    }
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

fn fenced_block<'a>(text: &'a str, opener: &str) -> Option<&'a str> {
    let start = text.find(opener)? + opener.len();
    let rest = &text[start..];
    let end = rest.find("```")?;
    Some(rest[..end].trim())
}

/// Parse the first JSON object found in `text`.
///
/// Returns `None` when no candidate is found, it does not parse, or it is
/// not an object.
pub fn extract_json_object(text: &str) -> Option<Map<String, Value>> {
    let candidate = find_json_text(text)?;
    match serde_json::from_str::<Value>(candidate) {
        Ok(Value::Object(map)) => Some(map),
        Ok(_) => None,
        Err(e) => {
            tracing::debug!(error = %e, "Model output is not valid JSON");
            None
        }
    }
}
