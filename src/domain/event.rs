//! Round transcript and streaming events.
//!
//! Every round's proposal, decision and (if any) execution result is recorded
//! so a human can audit the session after the fact, and emitted as it happens
//! for anything watching live.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::action::ActionProposal;
use super::decision::GateDecision;
use super::execution::ExecutionResult;
use super::outcome::LoopOutcome;

/// Audit record for one round.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundRecord {
    pub round: u32,
    pub started_at: DateTime<Utc>,
    /// None when the proposer failed to produce a valid proposal
    pub proposal: Option<ActionProposal>,
    pub decision: Option<GateDecision>,
    pub result: Option<ExecutionResult>,
    /// Proposer or evaluator failure folded into context instead
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

impl RoundRecord {
    pub fn new(round: u32) -> Self {
        Self {
            round,
            started_at: Utc::now(),
            proposal: None,
            decision: None,
            result: None,
            failure: None,
        }
    }

    pub fn was_executed(&self) -> bool {
        self.result.is_some()
    }
}

/// Live event emitted by the approval loop, in order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LoopEvent {
    RoundStarted {
        session_id: String,
        round: u32,
    },
    Proposed {
        round: u32,
        proposal: ActionProposal,
    },
    ProposalFailed {
        round: u32,
        error: String,
    },
    Decided {
        round: u32,
        decision: GateDecision,
    },
    Executed {
        round: u32,
        result: ExecutionResult,
    },
    Finished {
        session_id: String,
        outcome: LoopOutcome,
        rounds: u32,
        mutations: u32,
    },
}
