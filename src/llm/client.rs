//! LLM client trait and an in-memory mock

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{GatewayError, Result};
use crate::llm::types::{CompletionRequest, CompletionResponse};

/// Stateless LLM client - each call is independent
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse>;

    fn model(&self) -> &str;

    fn is_ready(&self) -> bool;
}

/// Replays queued responses in order and records every request it sees
#[derive(Debug, Default)]
pub struct MockLlmClient {
    responses: Mutex<VecDeque<Result<CompletionResponse>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(self, response: CompletionResponse) -> Self {
        self.push(Ok(response));
        self
    }

    pub fn with_error(self, message: impl Into<String>) -> Self {
        self.push(Err(GatewayError::Llm(message.into())));
        self
    }

    fn push(&self, item: Result<CompletionResponse>) {
        self.responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(item);
    }

    /// Requests received so far
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request);

        self.responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .unwrap_or_else(|| Err(GatewayError::Llm("mock has no queued responses".to_string())))
    }

    fn model(&self) -> &str {
        "mock"
    }

    fn is_ready(&self) -> bool {
        true
    }
}
