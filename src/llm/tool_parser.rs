//! Tool parser for extracting tool calls from Anthropic API responses

use serde_json::Value;

use crate::error::{GatewayError, Result};
use crate::llm::types::{CompletionResponse, StopReason, ToolCall, ToolDefinition, Usage};

/// Parse a raw Anthropic API response into a CompletionResponse
pub fn parse_response(response: &Value) -> Result<CompletionResponse> {
    let blocks = response
        .get("content")
        .and_then(|c| c.as_array())
        .ok_or_else(|| GatewayError::Llm("response has no content blocks".to_string()))?;

    let mut content = String::new();
    let mut tool_calls = Vec::new();

    for block in blocks {
        match block.get("type").and_then(|t| t.as_str()) {
            Some("text") => {
                if let Some(text) = block.get("text").and_then(|t| t.as_str()) {
                    if !content.is_empty() {
                        content.push('\n');
                    }
                    content.push_str(text);
                }
            }
            Some("tool_use") => {
                if let Some(call) = parse_tool_use_block(block) {
                    tool_calls.push(call);
                }
            }
            _ => {}
        }
    }

    let stop_reason = response
        .get("stop_reason")
        .and_then(|s| s.as_str())
        .map(parse_stop_reason)
        .unwrap_or_default();

    let usage = response.get("usage").map(parse_usage).unwrap_or_default();

    Ok(CompletionResponse {
        content,
        tool_calls,
        stop_reason,
        usage,
    })
}

fn parse_tool_use_block(block: &Value) -> Option<ToolCall> {
    let id = block.get("id").and_then(|v| v.as_str())?;
    let name = block.get("name").and_then(|v| v.as_str())?;
    let input = block
        .get("input")
        .cloned()
        .unwrap_or(Value::Object(Default::default()));

    Some(ToolCall::new(id, name, input))
}

fn parse_stop_reason(reason: &str) -> StopReason {
    match reason {
        "tool_use" => StopReason::ToolUse,
        "max_tokens" => StopReason::MaxTokens,
        "stop_sequence" => StopReason::StopSequence,
        _ => StopReason::EndTurn,
    }
}

fn parse_usage(usage: &Value) -> Usage {
    Usage::new(
        usage.get("input_tokens").and_then(|v| v.as_u64()).unwrap_or(0),
        usage.get("output_tokens").and_then(|v| v.as_u64()).unwrap_or(0),
    )
}

/// Check that every required field of the tool's schema is present
pub fn validate_tool_input(call: &ToolCall, definition: &ToolDefinition) -> Result<()> {
    let required = definition
        .input_schema
        .get("required")
        .and_then(|r| r.as_array())
        .into_iter()
        .flatten()
        .filter_map(|r| r.as_str());

    for field in required {
        if call.input.get(field).is_none() {
            return Err(GatewayError::Proposal(format!(
                "tool '{}' missing required field: {}",
                call.name, field
            )));
        }
    }
    Ok(())
}

/// First call to `name`, validated against its definition
pub fn expect_tool_call<'a>(response: &'a CompletionResponse, definition: &ToolDefinition) -> Result<&'a ToolCall> {
    let call = response
        .tool_calls
        .iter()
        .find(|c| c.name == definition.name)
        .ok_or_else(|| {
            let names: Vec<&str> = response.tool_calls.iter().map(|c| c.name.as_str()).collect();
            GatewayError::Proposal(if names.is_empty() {
                format!("no {} tool call in response", definition.name)
            } else {
                format!("expected a {} tool call, got: {}", definition.name, names.join(", "))
            })
        })?;

    validate_tool_input(call, definition)?;
    Ok(call)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn definition() -> ToolDefinition {
        ToolDefinition::new(
            "propose_action",
            "Propose one action",
            json!({
                "type": "object",
                "properties": {"target": {"type": "string"}, "rationale": {"type": "string"}},
                "required": ["target", "rationale"]
            }),
        )
    }

    #[test]
    fn test_parse_response_text_only() {
        let response = json!({
            "content": [{"type": "text", "text": "Hello, world!"}],
            "stop_reason": "end_turn",
            "usage": {"input_tokens": 10, "output_tokens": 5}
        });

        let result = parse_response(&response).unwrap();
        assert_eq!(result.content, "Hello, world!");
        assert!(result.tool_calls.is_empty());
        assert_eq!(result.stop_reason, StopReason::EndTurn);
        assert_eq!(result.usage, Usage::new(10, 5));
    }

    #[test]
    fn test_parse_response_with_tool_use() {
        let response = json!({
            "content": [
                {"type": "text", "text": "Writing the notes."},
                {"type": "tool_use", "id": "toolu_1", "name": "propose_action", "input": {"target": "notes.md"}}
            ],
            "stop_reason": "tool_use"
        });

        let result = parse_response(&response).unwrap();
        assert_eq!(result.content, "Writing the notes.");
        assert_eq!(result.tool_calls.len(), 1);
        assert_eq!(result.tool_calls[0].input["target"], "notes.md");
        assert_eq!(result.stop_reason, StopReason::ToolUse);
        assert_eq!(result.usage, Usage::default());
    }

    #[test]
    fn test_parse_response_multiple_text_blocks() {
        let response = json!({
            "content": [{"type": "text", "text": "one"}, {"type": "thinking"}, {"type": "text", "text": "two"}]
        });
        assert_eq!(parse_response(&response).unwrap().content, "one\ntwo");
    }

    #[test]
    fn test_parse_response_without_content_is_error() {
        assert!(parse_response(&json!({"error": "overloaded"})).is_err());
    }

    #[test]
    fn test_tool_use_block_without_id_is_skipped() {
        let response = json!({"content": [{"type": "tool_use", "name": "x", "input": {}}]});
        assert!(parse_response(&response).unwrap().tool_calls.is_empty());
    }

    #[test]
    fn test_validate_tool_input_missing_field() {
        let call = ToolCall::new("t", "propose_action", json!({"target": "a"}));
        let err = validate_tool_input(&call, &definition()).unwrap_err();
        assert!(err.to_string().contains("rationale"));
    }

    #[test]
    fn test_expect_tool_call() {
        let def = definition();
        let ok = CompletionResponse::tool_call("propose_action", json!({"target": "a", "rationale": "b"}));
        assert_eq!(expect_tool_call(&ok, &def).unwrap().input["target"], "a");

        let none = CompletionResponse::text("I think we should write a file");
        assert!(expect_tool_call(&none, &def).unwrap_err().to_string().contains("no propose_action"));

        let other = CompletionResponse::tool_call("run_shell", json!({}));
        assert!(expect_tool_call(&other, &def).unwrap_err().to_string().contains("run_shell"));
    }
}
