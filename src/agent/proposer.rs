//! LLM-backed proposer

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};

use super::Proposer;
use crate::domain::{ActionProposal, ActionType};
use crate::error::{GatewayError, Result};
use crate::llm::{CompletionRequest, LlmClient, ToolDefinition, expect_tool_call};
use crate::prompt::templates::PROPOSER_SYSTEM;
use crate::prompt::{PROPOSER, PromptRenderer};

/// Name of the only tool the proposer may call
pub const PROPOSE_ACTION: &str = "propose_action";

/// The `propose_action` tool, its enum built from [`ActionType::ALL`]
pub fn propose_action_tool() -> ToolDefinition {
    let actions: Vec<String> = ActionType::ALL
        .iter()
        .map(|a| format!("{}: {}", a, a.describe()))
        .collect();

    ToolDefinition::new(
        PROPOSE_ACTION,
        format!(
            "Propose exactly one action for the evaluator to approve or decline. Available actions: {}.",
            actions.join("; ")
        ),
        json!({
            "type": "object",
            "properties": {
                "action_type": {
                    "type": "string",
                    "enum": ActionType::tags(),
                    "description": "The action to perform"
                },
                "target": {
                    "type": "string",
                    "description": "File path relative to the repository root (empty for COMPLETED)"
                },
                "contents_or_diff": {
                    "type": "string",
                    "description": "Full file contents for WRITE_FILE, a unified diff or full contents for EDIT_FILE, empty otherwise"
                },
                "rationale": {
                    "type": "string",
                    "description": "Why this action moves toward the goal"
                }
            },
            "required": ["action_type", "target", "rationale"]
        }),
    )
}

/// Build a proposal from `propose_action` tool input
pub fn proposal_from_input(input: &Value) -> Result<ActionProposal> {
    let action_type = str_field(input, "action_type")
        .parse::<ActionType>()
        .map_err(|e| GatewayError::Proposal(e.to_string()))?;

    let proposal = ActionProposal::new(
        action_type,
        str_field(input, "target"),
        str_field(input, "contents_or_diff"),
        str_field(input, "rationale"),
    );
    proposal.validate()?;
    Ok(proposal)
}

fn str_field<'a>(input: &'a Value, name: &str) -> &'a str {
    input.get(name).and_then(|v| v.as_str()).unwrap_or_default()
}

pub struct LlmProposer {
    client: Arc<dyn LlmClient>,
    renderer: PromptRenderer,
    model: Option<String>,
    max_tokens: Option<u32>,
}

impl LlmProposer {
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self {
            client,
            renderer: PromptRenderer::new(),
            model: None,
            max_tokens: None,
        }
    }

    /// Use a model other than the client's default
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    fn build_request(&self, goal: &str, context: &str, snapshot: &str) -> Result<CompletionRequest> {
        let user_prompt = self.renderer.render_named(
            PROPOSER,
            &json!({
                "goal": goal,
                "context": context,
                "snapshot": snapshot,
            }),
        )?;

        let mut request = CompletionRequest::new(PROPOSER_SYSTEM)
            .with_user_message(user_prompt)
            .with_tools(vec![propose_action_tool()])
            .with_tool_choice(PROPOSE_ACTION);
        if let Some(model) = &self.model {
            request = request.with_model(model);
        }
        if let Some(max_tokens) = self.max_tokens {
            request = request.with_max_tokens(max_tokens);
        }
        Ok(request)
    }
}

#[async_trait]
impl Proposer for LlmProposer {
    async fn propose(&self, goal: &str, context: &str, snapshot: &str) -> Result<ActionProposal> {
        let request = self.build_request(goal, context, snapshot)?;
        let response = self.client.complete(request).await?;

        let tool = propose_action_tool();
        let call = expect_tool_call(&response, &tool)?;
        proposal_from_input(&call.input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{CompletionResponse, MockLlmClient};

    fn proposer_with(mock: MockLlmClient) -> (Arc<MockLlmClient>, LlmProposer) {
        let mock = Arc::new(mock);
        let proposer = LlmProposer::new(mock.clone());
        (mock, proposer)
    }

    #[test]
    fn test_tool_schema_lists_every_action() {
        let tool = propose_action_tool();
        let tags = tool.input_schema["properties"]["action_type"]["enum"].as_array().unwrap().clone();
        assert_eq!(tags.len(), ActionType::ALL.len());
        assert!(tags.contains(&json!("EDIT_FILE")));
        assert!(!tags.contains(&json!("CREATE_DIR")));
    }

    #[test]
    fn test_proposal_from_input() {
        let proposal = proposal_from_input(&json!({
            "action_type": "write_file",
            "target": "notes.md",
            "contents_or_diff": "hi",
            "rationale": "seed notes"
        }))
        .unwrap();
        assert_eq!(proposal, ActionProposal::new(ActionType::WriteFile, "notes.md", "hi", "seed notes"));
    }

    #[test]
    fn test_proposal_from_input_rejects_unknown_tag() {
        let err = proposal_from_input(&json!({"action_type": "run_shell", "target": "x", "rationale": "r"})).unwrap_err();
        assert!(matches!(err, GatewayError::Proposal(_)));
        assert!(err.to_string().contains("run_shell"));
    }

    #[test]
    fn test_proposal_from_input_requires_rationale() {
        let err = proposal_from_input(&json!({"action_type": "OPEN_FILE", "target": "x"})).unwrap_err();
        assert!(matches!(err, GatewayError::Proposal(_)));
    }

    #[tokio::test]
    async fn test_propose_sends_forced_tool_request() {
        let (mock, proposer) = proposer_with(MockLlmClient::new().with_response(CompletionResponse::tool_call(
            PROPOSE_ACTION,
            json!({"action_type": "OPEN_FILE", "target": "README.md", "rationale": "look first"}),
        )));
        let proposer = proposer.with_model("claude-haiku").with_max_tokens(256);

        let proposal = proposer
            .propose("document the api", "EDIT_FILE README.md declined: too big; try again", "README.md (5 bytes)")
            .await
            .unwrap();
        assert_eq!(proposal.action_type, ActionType::OpenFile);
        assert_eq!(proposal.target, "README.md");

        let requests = mock.requests();
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert_eq!(request.system, PROPOSER_SYSTEM);
        assert_eq!(request.tool_choice.as_deref(), Some(PROPOSE_ACTION));
        assert_eq!(request.model.as_deref(), Some("claude-haiku"));
        assert_eq!(request.max_tokens, Some(256));
        let prompt = &request.messages[0].content;
        assert!(prompt.contains("document the api"));
        assert!(prompt.contains("too big; try again"));
        assert!(prompt.contains("README.md (5 bytes)"));
    }

    #[tokio::test]
    async fn test_first_round_prompt_omits_history() {
        let (mock, proposer) = proposer_with(MockLlmClient::new().with_response(CompletionResponse::tool_call(
            PROPOSE_ACTION,
            json!({"action_type": "COMPLETED", "target": "", "rationale": "nothing to do"}),
        )));

        let proposal = proposer.propose("goal", "", "").await.unwrap();
        assert_eq!(proposal.action_type, ActionType::Completed);
        assert!(!mock.requests()[0].messages[0].content.contains("earlier rounds"));
    }

    #[tokio::test]
    async fn test_text_only_response_is_proposal_error() {
        let (_, proposer) = proposer_with(MockLlmClient::new().with_response(CompletionResponse::text("I would write a file")));
        let err = proposer.propose("g", "", "").await.unwrap_err();
        assert!(matches!(err, GatewayError::Proposal(_)));
    }

    #[tokio::test]
    async fn test_client_error_propagates() {
        let (_, proposer) = proposer_with(MockLlmClient::new().with_error("overloaded"));
        let err = proposer.propose("g", "", "").await.unwrap_err();
        assert!(matches!(err, GatewayError::Llm(_)));
    }
}
