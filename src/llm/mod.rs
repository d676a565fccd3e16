//! LLM client layer
//!
//! This module provides:
//! - Message types for LLM communication
//! - LlmClient trait and MockLlmClient
//! - AnthropicClient implementation
//! - Tool call parsing

pub mod anthropic;
pub mod client;
pub mod tool_parser;
pub mod types;

pub use anthropic::{AnthropicClient, AnthropicConfig};
pub use client::{LlmClient, MockLlmClient};
pub use tool_parser::{expect_tool_call, parse_response, validate_tool_input};
pub use types::{CompletionRequest, CompletionResponse, Message, Role, StopReason, ToolCall, ToolDefinition, Usage};
