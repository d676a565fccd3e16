//! The two agents around the gateway
//!
//! A `Proposer` asks for one action per round; an `Evaluator` approves or
//! declines it. Neither can touch the repository: only the approval loop
//! hands approved proposals to the executor.

use async_trait::async_trait;

use crate::domain::{ActionProposal, GateDecision};
use crate::error::Result;

mod evaluator;
mod proposer;
mod scripted;

pub use evaluator::{LlmEvaluator, StaticEvaluator, parse_gate_response};
pub use proposer::{LlmProposer, PROPOSE_ACTION, propose_action_tool, proposal_from_input};
pub use scripted::{ScriptedEvaluator, ScriptedProposer};

/// Emits exactly one proposal per call
#[async_trait]
pub trait Proposer: Send + Sync {
    async fn propose(&self, goal: &str, context: &str, snapshot: &str) -> Result<ActionProposal>;
}

/// Emits exactly one decision per call. A decline's rationale should name
/// the concrete objection.
#[async_trait]
pub trait Evaluator: Send + Sync {
    async fn evaluate(&self, goal: &str, snapshot: &str, proposal: &ActionProposal) -> Result<GateDecision>;
}
