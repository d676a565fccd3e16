//! Agents that replay a fixed script, for tests and demos

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{Evaluator, Proposer};
use crate::domain::{ActionProposal, GateDecision};
use crate::error::{GatewayError, Result};

/// Replays proposals in order. With `repeat`, the last one is replayed forever.
#[derive(Debug, Default)]
pub struct ScriptedProposer {
    script: Mutex<VecDeque<Result<ActionProposal>>>,
    last: Mutex<Option<ActionProposal>>,
    repeat: bool,
    contexts: Mutex<Vec<String>>,
}

impl ScriptedProposer {
    pub fn new(proposals: impl IntoIterator<Item = ActionProposal>) -> Self {
        Self {
            script: Mutex::new(proposals.into_iter().map(Ok).collect()),
            ..Default::default()
        }
    }

    /// Propose the same action every round
    pub fn repeating(proposal: ActionProposal) -> Self {
        Self {
            repeat: true,
            ..Self::new([proposal])
        }
    }

    /// Queue a failure, as a flaky proposer would produce
    pub fn then_fail(self, message: impl Into<String>) -> Self {
        self.script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(Err(GatewayError::Proposal(message.into())));
        self
    }

    pub fn then(self, proposal: ActionProposal) -> Self {
        self.script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(Ok(proposal));
        self
    }

    /// Rolling context seen on each call
    pub fn contexts(&self) -> Vec<String> {
        self.contexts.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl Proposer for ScriptedProposer {
    async fn propose(&self, _goal: &str, context: &str, _snapshot: &str) -> Result<ActionProposal> {
        self.contexts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(context.to_string());

        let next = self.script.lock().unwrap_or_else(|e| e.into_inner()).pop_front();
        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        match next {
            Some(Ok(proposal)) => {
                *last = Some(proposal.clone());
                Ok(proposal)
            }
            Some(Err(e)) => Err(e),
            None => match (&*last, self.repeat) {
                (Some(proposal), true) => Ok(proposal.clone()),
                _ => Err(GatewayError::Proposal("script exhausted".to_string())),
            },
        }
    }
}

/// Replays decisions in order, then declines everything
#[derive(Debug, Default)]
pub struct ScriptedEvaluator {
    script: Mutex<VecDeque<Result<GateDecision>>>,
    seen: Mutex<Vec<ActionProposal>>,
}

impl ScriptedEvaluator {
    pub fn new(decisions: impl IntoIterator<Item = GateDecision>) -> Self {
        Self {
            script: Mutex::new(decisions.into_iter().map(Ok).collect()),
            ..Default::default()
        }
    }

    /// Queue a failure, as an unreachable evaluator would produce
    pub fn then_fail(self, message: impl Into<String>) -> Self {
        self.script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(Err(GatewayError::Llm(message.into())));
        self
    }

    pub fn then(self, decision: GateDecision) -> Self {
        self.script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(Ok(decision));
        self
    }

    /// Proposals evaluated so far
    pub fn seen(&self) -> Vec<ActionProposal> {
        self.seen.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl Evaluator for ScriptedEvaluator {
    async fn evaluate(&self, _goal: &str, _snapshot: &str, proposal: &ActionProposal) -> Result<GateDecision> {
        self.seen
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(proposal.clone());

        self.script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .unwrap_or_else(|| Ok(GateDecision::decline("no scripted decision left")))
    }
}
