//! Session record and the approval loop's state machine.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::id::generate_session_id;

/// Where a session is in the propose → evaluate → execute cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopState {
    AwaitingProposal,
    AwaitingDecision,
    Executing,
    Skipped,
    Completed,
    Exhausted,
}

impl LoopState {
    /// Legal transitions of the approval loop.
    pub fn can_transition_to(&self, next: LoopState) -> bool {
        use LoopState::*;
        matches!(
            (self, next),
            (AwaitingProposal, AwaitingDecision)
                | (AwaitingProposal, Skipped)
                | (AwaitingDecision, Executing)
                | (AwaitingDecision, Skipped)
                | (AwaitingDecision, Completed)
                | (Executing, AwaitingProposal)
                | (Executing, Exhausted)
                | (Skipped, AwaitingProposal)
                | (Skipped, Exhausted)
        )
    }
}

impl fmt::Display for LoopState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LoopState::AwaitingProposal => "AWAITING_PROPOSAL",
            LoopState::AwaitingDecision => "AWAITING_DECISION",
            LoopState::Executing => "EXECUTING",
            LoopState::Skipped => "SKIPPED",
            LoopState::Completed => "COMPLETED",
            LoopState::Exhausted => "EXHAUSTED",
        };
        f.write_str(s)
    }
}

/// One user goal being worked through the approval loop. Lives only in memory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub goal: String,
    /// Canonical repository root
    pub repo_root: PathBuf,
    pub rolling_context: String,
    /// Completed propose/evaluate cycles
    pub round: u32,
    pub max_rounds: u32,
    pub state: LoopState,
}

impl Session {
    pub fn new(goal: impl Into<String>, repo_root: PathBuf, max_rounds: u32) -> Self {
        Self {
            id: generate_session_id(),
            goal: goal.into(),
            repo_root,
            rolling_context: String::new(),
            round: 0,
            max_rounds,
            state: LoopState::AwaitingProposal,
        }
    }

    /// Move to `next`, logging transitions the state machine does not allow.
    pub fn transition(&mut self, next: LoopState) {
        if !self.state.can_transition_to(next) {
            log::warn!(
                "Session {}: unexpected transition {} -> {}",
                self.id,
                self.state,
                next
            );
        }
        self.state = next;
    }

    /// Append one line to the rolling context.
    pub fn note(&mut self, line: impl AsRef<str>) {
        if !self.rolling_context.is_empty() {
            self.rolling_context.push('\n');
        }
        self.rolling_context.push_str(line.as_ref());
    }

    pub fn budget_spent(&self) -> bool {
        self.round >= self.max_rounds
    }
}
