//! Evaluators: the LLM gate and the fixed-answer gates

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};

use super::Evaluator;
use crate::domain::{ActionProposal, ActionType, Decision, GateDecision};
use crate::error::Result;
use crate::llm::{CompletionRequest, LlmClient};
use crate::prompt::{GATE, PromptRenderer};

const GATE_SYSTEM: &str =
    "You are a strict reviewer guarding a repository. You answer with a single JSON object and nothing else.";

/// Asks an LLM to approve or decline. Anything it says that cannot be read as
/// a verdict is a decline.
pub struct LlmEvaluator {
    client: Arc<dyn LlmClient>,
    renderer: PromptRenderer,
    model: Option<String>,
    max_tokens: u32,
}

impl LlmEvaluator {
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self {
            client,
            renderer: PromptRenderer::new(),
            model: None,
            max_tokens: 500,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    fn build_prompt(&self, goal: &str, snapshot: &str, proposal: &ActionProposal) -> Result<String> {
        let actions: Vec<Value> = ActionType::ALL
            .iter()
            .map(|a| json!({"tag": a.as_str(), "description": a.describe()}))
            .collect();

        self.renderer.render_named(
            GATE,
            &json!({
                "goal": goal,
                "actions": actions,
                "snapshot": snapshot,
                "action": serde_json::to_string_pretty(proposal)?,
            }),
        )
    }
}

#[async_trait]
impl Evaluator for LlmEvaluator {
    async fn evaluate(&self, goal: &str, snapshot: &str, proposal: &ActionProposal) -> Result<GateDecision> {
        let prompt = self.build_prompt(goal, snapshot, proposal)?;

        let mut request = CompletionRequest::new(GATE_SYSTEM)
            .with_user_message(prompt)
            .with_max_tokens(self.max_tokens);
        if let Some(model) = &self.model {
            request = request.with_model(model);
        }

        let response = self.client.complete(request).await?;
        Ok(parse_gate_response(&response.content))
    }
}

/// Read a verdict out of the gate's reply. Never fails: unreadable replies
/// decline with the reason they could not be read.
pub fn parse_gate_response(text: &str) -> GateDecision {
    let object = match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => &text[start..=end],
        _ => return GateDecision::decline(format!("Evaluator reply contained no JSON object: {}", excerpt(text))),
    };

    let value: Value = match serde_json::from_str(object) {
        Ok(value) => value,
        Err(e) => return GateDecision::decline(format!("Evaluator reply was not valid JSON ({}): {}", e, excerpt(text))),
    };

    let rationale = ["rationale", "reason"]
        .iter()
        .find_map(|key| value.get(*key).and_then(|v| v.as_str()))
        .unwrap_or_default()
        .trim()
        .to_string();

    let verdict = value.get("decision").and_then(|v| v.as_str()).unwrap_or_default();
    match parse_verdict(verdict) {
        Some(Decision::Approve) => GateDecision::approve(rationale),
        Some(Decision::Decline) if rationale.is_empty() => GateDecision::decline("declined without a stated reason"),
        Some(Decision::Decline) => GateDecision::decline(rationale),
        None => GateDecision::decline(format!("Evaluator gave no recognizable decision: {:?}", verdict)),
    }
}

fn parse_verdict(verdict: &str) -> Option<Decision> {
    match verdict.trim().to_ascii_lowercase().as_str() {
        "approve" | "approved" | "accept" | "accepted" => Some(Decision::Approve),
        "decline" | "declined" | "reject" | "rejected" => Some(Decision::Decline),
        _ => None,
    }
}

fn excerpt(text: &str) -> String {
    const MAX_CHARS: usize = 200;
    let trimmed = text.trim();
    if trimmed.chars().count() <= MAX_CHARS {
        trimmed.to_string()
    } else {
        format!("{}…", trimmed.chars().take(MAX_CHARS).collect::<String>())
    }
}

/// Gives the same answer to everything
#[derive(Debug, Clone)]
pub struct StaticEvaluator {
    decision: Decision,
}

impl StaticEvaluator {
    pub fn approve_all() -> Self {
        Self {
            decision: Decision::Approve,
        }
    }

    pub fn decline_all() -> Self {
        Self {
            decision: Decision::Decline,
        }
    }
}

#[async_trait]
impl Evaluator for StaticEvaluator {
    async fn evaluate(&self, _goal: &str, _snapshot: &str, proposal: &ActionProposal) -> Result<GateDecision> {
        Ok(match self.decision {
            Decision::Approve => GateDecision::approve(format!("{} approved without review", proposal)),
            Decision::Decline => GateDecision::decline(format!("{} refused: this gate declines every action", proposal)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GatewayError;
    use crate::llm::{CompletionResponse, MockLlmClient};

    fn proposal() -> ActionProposal {
        ActionProposal::new(ActionType::WriteFile, "notes.md", "hi", "seed notes")
    }

    #[test]
    fn test_parse_plain_json() {
        let decision = parse_gate_response(r#"{"decision": "approve", "rationale": "small and safe"}"#);
        assert_eq!(decision, GateDecision::approve("small and safe"));
    }

    #[test]
    fn test_parse_json_wrapped_in_prose() {
        let text = "Here is my verdict:\n```json\n{\"decision\": \"REJECT\", \"reason\": \"deletes tests\"}\n```";
        assert_eq!(parse_gate_response(text), GateDecision::decline("deletes tests"));
    }

    #[test]
    fn test_parse_aliases() {
        for verdict in ["accept", "Approved", "ACCEPTED"] {
            let text = format!(r#"{{"decision": "{}"}}"#, verdict);
            assert!(parse_gate_response(&text).is_approved(), "{}", verdict);
        }
        for verdict in ["declined", "Reject"] {
            let text = format!(r#"{{"decision": "{}"}}"#, verdict);
            assert!(!parse_gate_response(&text).is_approved(), "{}", verdict);
        }
    }

    #[test]
    fn test_unreadable_reply_declines() {
        let decision = parse_gate_response("Sure, go ahead!");
        assert!(!decision.is_approved());
        assert!(decision.rationale.contains("no JSON object"));

        let decision = parse_gate_response("{decision: approve}");
        assert!(!decision.is_approved());
        assert!(decision.rationale.contains("not valid JSON"));

        let decision = parse_gate_response(r#"{"decision": "maybe"}"#);
        assert!(!decision.is_approved());
        assert!(decision.rationale.contains("maybe"));
    }

    #[test]
    fn test_decline_without_reason_gets_one() {
        let decision = parse_gate_response(r#"{"decision": "decline"}"#);
        assert!(!decision.rationale.is_empty());
    }

    #[tokio::test]
    async fn test_static_evaluators() {
        let approve = StaticEvaluator::approve_all().evaluate("g", "", &proposal()).await.unwrap();
        assert!(approve.is_approved());

        let decline = StaticEvaluator::decline_all().evaluate("g", "", &proposal()).await.unwrap();
        assert!(!decline.is_approved());
        assert!(decline.rationale.contains("WRITE_FILE notes.md"));
    }

    #[tokio::test]
    async fn test_llm_evaluator_renders_gate_prompt() {
        let mock = Arc::new(
            MockLlmClient::new().with_response(CompletionResponse::text(r#"{"decision":"approve","rationale":"ok"}"#)),
        );
        let evaluator = LlmEvaluator::new(mock.clone()).with_model("claude-haiku");

        let decision = evaluator.evaluate("write notes", "README.md (5 bytes)", &proposal()).await.unwrap();
        assert_eq!(decision, GateDecision::approve("ok"));

        let request = &mock.requests()[0];
        assert_eq!(request.model.as_deref(), Some("claude-haiku"));
        assert!(request.tools.is_empty());
        let prompt = &request.messages[0].content;
        assert!(prompt.contains("Their goal is: write notes"));
        assert!(prompt.contains("- DELETE_FILE: delete an existing file"));
        assert!(prompt.contains("README.md (5 bytes)"));
        assert!(prompt.contains("\"action_type\": \"WRITE_FILE\""));
    }

    #[tokio::test]
    async fn test_llm_evaluator_client_error_propagates() {
        let evaluator = LlmEvaluator::new(Arc::new(MockLlmClient::new().with_error("timeout")));
        let err = evaluator.evaluate("g", "", &proposal()).await.unwrap_err();
        assert!(matches!(err, GatewayError::Llm(_)));
    }
}
