//! Prompt Renderer - Handlebars rendering for agent prompts

use handlebars::Handlebars;
use serde::Serialize;

use super::templates::{GATE_TEMPLATE, PROPOSER_TEMPLATE};
use crate::error::{GatewayError, Result};

/// Name the proposer's user prompt is registered under
pub const PROPOSER: &str = "proposer";

/// Name the evaluator's gate prompt is registered under
pub const GATE: &str = "gate";

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
    /// Renderer with the built-in proposer and gate templates registered
    pub fn new() -> Self {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(false);
        // File contents and diffs must reach the model untouched
        handlebars.register_escape_fn(handlebars::no_escape);

        let mut renderer = Self { handlebars };
        for (name, template) in [(PROPOSER, PROPOSER_TEMPLATE), (GATE, GATE_TEMPLATE)] {
            if let Err(e) = renderer.register_template(name, template) {
                log::error!("Built-in template '{}' failed to register: {}", name, e);
            }
        }
        renderer
    }

    /// Render a template string with any serializable context
    pub fn render_with<T: Serialize>(&self, template: &str, context: &T) -> Result<String> {
        self.handlebars
            .render_template(template, context)
            .map_err(|e| GatewayError::InvalidConfig(format!("Failed to render template: {}", e)))
    }

    /// Register (or replace) a named template
    pub fn register_template(&mut self, name: &str, template: &str) -> Result<()> {
        self.handlebars
            .register_template_string(name, template)
            .map_err(|e| GatewayError::InvalidConfig(format!("Failed to register template '{}': {}", name, e)))
    }

    pub fn render_named<T: Serialize>(&self, name: &str, context: &T) -> Result<String> {
        self.handlebars
            .render(name, context)
            .map_err(|e| GatewayError::InvalidConfig(format!("Failed to render template '{}': {}", name, e)))
    }

    pub fn has_template(&self, name: &str) -> bool {
        self.handlebars.get_template(name).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builtin_templates_registered() {
        let renderer = PromptRenderer::new();
        assert!(renderer.has_template(PROPOSER));
        assert!(renderer.has_template(GATE));
        assert!(!renderer.has_template("nonexistent"));
    }

    #[test]
    fn test_render_missing_variable_is_empty() {
        let renderer = PromptRenderer::new();
        let result = renderer.render_with("Hello, {{name}}!", &json!({})).unwrap();
        assert_eq!(result, "Hello, !");
    }

    #[test]
    fn test_render_does_not_escape() {
        let renderer = PromptRenderer::new();
        let result = renderer
            .render_with("{{diff}}", &json!({"diff": "-<a href=\"x\">\n+&amp;"}))
            .unwrap();
        assert_eq!(result, "-<a href=\"x\">\n+&amp;");
    }

    #[test]
    fn test_register_and_render_named() {
        let mut renderer = PromptRenderer::new();
        renderer.register_template("greet", "Hi {{who}}").unwrap();
        assert_eq!(renderer.render_named("greet", &json!({"who": "there"})).unwrap(), "Hi there");
    }

    #[test]
    fn test_invalid_template_rejected() {
        let mut renderer = PromptRenderer::new();
        assert!(renderer.register_template("bad", "{{#if ready}}unclosed").is_err());
    }

    #[test]
    fn test_render_unknown_name_is_error() {
        let renderer = PromptRenderer::new();
        assert!(renderer.render_named("missing", &json!({})).is_err());
    }
}
