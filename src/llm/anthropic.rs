//! Anthropic Messages API client

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};

use crate::config::LlmConfig;
use crate::error::{GatewayError, Result};
use crate::llm::client::LlmClient;
use crate::llm::tool_parser;
use crate::llm::types::{CompletionRequest, CompletionResponse, Role, Usage};

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";

const ANTHROPIC_VERSION: &str = "2023-06-01";

const API_KEY_ENV: &str = "ANTHROPIC_API_KEY";

#[derive(Debug, Clone)]
pub struct AnthropicConfig {
    pub model: String,
    pub max_tokens: u32,
    pub timeout: Duration,
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self::from(&LlmConfig::default())
    }
}

impl From<&LlmConfig> for AnthropicConfig {
    fn from(config: &LlmConfig) -> Self {
        Self {
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            timeout: Duration::from_millis(config.timeout_ms),
        }
    }
}

pub struct AnthropicClient {
    client: Client,
    api_key: String,
    config: AnthropicConfig,
    usage: Mutex<Usage>,
}

impl AnthropicClient {
    /// Reads the API key from `ANTHROPIC_API_KEY`
    pub fn new(config: AnthropicConfig) -> Result<Self> {
        let api_key = std::env::var(API_KEY_ENV).map_err(|_| GatewayError::Llm(format!("{} not set", API_KEY_ENV)))?;
        Self::with_api_key(api_key, config)
    }

    pub fn with_api_key(api_key: String, config: AnthropicConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| GatewayError::Llm(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key,
            config,
            usage: Mutex::new(Usage::default()),
        })
    }

    fn build_request(&self, request: &CompletionRequest) -> Value {
        let model = request.model.as_deref().unwrap_or(&self.config.model);
        let max_tokens = request.max_tokens.unwrap_or(self.config.max_tokens);

        let messages: Vec<Value> = request
            .messages
            .iter()
            .map(|m| {
                json!({
                    "role": match m.role {
                        Role::User => "user",
                        Role::Assistant => "assistant",
                    },
                    "content": m.content
                })
            })
            .collect();

        let mut body = json!({
            "model": model,
            "max_tokens": max_tokens,
            "messages": messages
        });

        if !request.system.is_empty() {
            body["system"] = json!(request.system);
        }

        if !request.tools.is_empty() {
            let tools: Vec<Value> = request.tools.iter().map(|t| t.to_anthropic_schema()).collect();
            body["tools"] = json!(tools);
        }

        if let Some(tool) = &request.tool_choice {
            body["tool_choice"] = json!({"type": "tool", "name": tool});
        }

        body
    }

    async fn send_request(&self, body: Value) -> Result<Value> {
        let response = self
            .client
            .post(ANTHROPIC_API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::Llm(format!("Request failed: {}", e)))?;

        let status = response.status();

        if status.as_u16() == 429 {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|h| h.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(60);
            return Err(GatewayError::Llm(format!(
                "Rate limited, retry after {} seconds",
                retry_after
            )));
        }

        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(GatewayError::Llm(format!("API error {}: {}", status, error_body)));
        }

        response
            .json()
            .await
            .map_err(|e| GatewayError::Llm(format!("Failed to parse response: {}", e)))
    }

    fn record_usage(&self, usage: &Usage) {
        self.usage.lock().unwrap_or_else(|e| e.into_inner()).add(usage);
    }

    /// Cumulative token usage across all calls
    pub fn total_usage(&self) -> Usage {
        self.usage.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl LlmClient for AnthropicClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let body = self.build_request(&request);
        log::debug!(
            "Sending request to {} ({} tools)",
            body["model"],
            request.tools.len()
        );
        let raw = self.send_request(body).await?;
        let response = tool_parser::parse_response(&raw)?;
        self.record_usage(&response.usage);
        Ok(response)
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    fn is_ready(&self) -> bool {
        !self.api_key.is_empty()
    }
}

impl std::fmt::Debug for AnthropicClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicClient")
            .field("model", &self.config.model)
            .field("max_tokens", &self.config.max_tokens)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ToolDefinition;

    fn client() -> AnthropicClient {
        AnthropicClient::with_api_key("test-key".to_string(), AnthropicConfig::default()).unwrap()
    }

    #[test]
    fn test_config_from_llm_config() {
        let llm = LlmConfig {
            model: "claude-haiku".to_string(),
            max_tokens: 512,
            timeout_ms: 2500,
            ..Default::default()
        };
        let config = AnthropicConfig::from(&llm);
        assert_eq!(config.model, "claude-haiku");
        assert_eq!(config.max_tokens, 512);
        assert_eq!(config.timeout, Duration::from_millis(2500));
    }

    #[test]
    fn test_client_with_api_key() {
        let client = client();
        assert!(client.is_ready());
        assert_eq!(client.model(), "claude-sonnet-4-20250514");
        assert_eq!(client.total_usage(), Usage::default());
    }

    #[test]
    fn test_empty_api_key_is_not_ready() {
        let client = AnthropicClient::with_api_key(String::new(), AnthropicConfig::default()).unwrap();
        assert!(!client.is_ready());
    }

    #[test]
    fn test_build_request_basic() {
        let request = CompletionRequest::new("You are careful").with_user_message("Hello");
        let body = client().build_request(&request);

        assert_eq!(body["model"], "claude-sonnet-4-20250514");
        assert_eq!(body["max_tokens"], 4096);
        assert_eq!(body["system"], "You are careful");
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "Hello");
        assert!(body.get("tools").is_none());
        assert!(body.get("tool_choice").is_none());
    }

    #[test]
    fn test_build_request_with_forced_tool() {
        let tool = ToolDefinition::new("propose_action", "Propose", json!({"type": "object"}));
        let request = CompletionRequest::new("s")
            .with_user_message("go")
            .with_tools(vec![tool])
            .with_tool_choice("propose_action");

        let body = client().build_request(&request);
        assert_eq!(body["tools"][0]["name"], "propose_action");
        assert_eq!(body["tool_choice"]["type"], "tool");
        assert_eq!(body["tool_choice"]["name"], "propose_action");
    }

    #[test]
    fn test_build_request_overrides() {
        let request = CompletionRequest::new("s")
            .with_user_message("go")
            .with_model("claude-opus-4")
            .with_max_tokens(64);

        let body = client().build_request(&request);
        assert_eq!(body["model"], "claude-opus-4");
        assert_eq!(body["max_tokens"], 64);
    }

    #[test]
    fn test_usage_is_cumulative() {
        let client = client();
        client.record_usage(&Usage::new(10, 5));
        client.record_usage(&Usage::new(3, 2));
        assert_eq!(client.total_usage(), Usage::new(13, 7));
    }
}
