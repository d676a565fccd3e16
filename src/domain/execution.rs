//! Structured result of one executor call.

use serde::{Deserialize, Serialize};

/// Marker appended when content is cut short for the rolling context
const CONTENT_TRUNCATED: &str = "…(content truncated)";

/// What the executor did. Always returned, never raised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub ok: bool,
    /// Tag as received, so unknown tags can be echoed back
    pub action_type: String,
    pub target: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExecutionResult {
    pub fn success(action_type: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            ok: true,
            action_type: action_type.into(),
            target: target.into(),
            content: None,
            error: None,
        }
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn failure(
        action_type: impl Into<String>,
        target: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            ok: false,
            action_type: action_type.into(),
            target: target.into(),
            content: None,
            error: Some(error.into()),
        }
    }

    /// One-paragraph summary for the proposer's rolling context. Content (from
    /// OPEN_FILE) is included up to `max_content_bytes`.
    pub fn summary(&self, max_content_bytes: usize) -> String {
        if !self.ok {
            return format!(
                "{} {} failed: {}",
                self.action_type,
                self.target,
                self.error.as_deref().unwrap_or("unknown error")
            );
        }

        let mut summary = format!("{} {} succeeded", self.action_type, self.target);
        if let Some(content) = &self.content {
            summary.push_str(&format!("\nContent of {}:\n", self.target));
            if content.len() > max_content_bytes {
                summary.push_str(truncate_at_char_boundary(content, max_content_bytes));
                summary.push('\n');
                summary.push_str(CONTENT_TRUNCATED);
            } else {
                summary.push_str(content);
            }
        }
        summary
    }
}

fn truncate_at_char_boundary(s: &str, max_bytes: usize) -> &str {
    let mut end = max_bytes.min(s.len());
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
