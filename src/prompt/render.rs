//! Prompt Renderer - Render templates with context variables using Handlebars

use handlebars::Handlebars;
use serde::Serialize;

use crate::error::{Result, VerimathError};

/// Renders prompt templates using Handlebars templating
pub struct PromptRenderer {
    handlebars: Handlebars<'static>,
}

impl Default for PromptRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl PromptRenderer {
    pub fn new() -> Self {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(false);
        // Prompts are plain text, not HTML
        handlebars.register_escape_fn(handlebars::no_escape);
        Self { handlebars }
    }

    /// Render a template string with any serializable context
    pub fn render_with<T: Serialize>(&self, template: &str, context: &T) -> Result<String> {
        self.handlebars
            .render_template(template, context)
            .map_err(|e| VerimathError::Template(format!("Failed to render template: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render_with_json() {
        let renderer = PromptRenderer::new();
        let result = renderer
            .render_with("Fetch {{pk}} / {{sk}}", &json!({"pk": "USER#alice", "sk": "PAIR#001"}))
            .unwrap();
        assert_eq!(result, "Fetch USER#alice / PAIR#001");
    }

    #[test]
    fn test_render_missing_variable_empty_string() {
        let renderer = PromptRenderer::new();
        let result = renderer.render_with("Hello, {{name}}!", &json!({})).unwrap();
        assert_eq!(result, "Hello, !");
    }

    #[test]
    fn test_render_no_escape() {
        let renderer = PromptRenderer::new();
        let result = renderer.render_with("{{key}}", &json!({"key": "USER#<a&b>"})).unwrap();
        assert_eq!(result, "USER#<a&b>");
    }
}
