//! Action tags and proposals.
//!
//! `ActionType` is the only definition of the action set. The proposer's tool
//! schema, the evaluator prompt and the executor dispatch all derive from it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{GatewayError, Result};

/// The fixed set of actions a proposer may ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionType {
    WriteFile,
    OpenFile,
    DeleteFile,
    EditFile,
    Completed,
}

impl ActionType {
    pub const ALL: [ActionType; 5] = [
        ActionType::WriteFile,
        ActionType::OpenFile,
        ActionType::DeleteFile,
        ActionType::EditFile,
        ActionType::Completed,
    ];

    /// Canonical wire tag
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::WriteFile => "WRITE_FILE",
            ActionType::OpenFile => "OPEN_FILE",
            ActionType::DeleteFile => "DELETE_FILE",
            ActionType::EditFile => "EDIT_FILE",
            ActionType::Completed => "COMPLETED",
        }
    }

    /// Whether a successful execution changes the repository
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            ActionType::WriteFile | ActionType::EditFile | ActionType::DeleteFile
        )
    }

    /// One-line description used in prompts
    pub fn describe(&self) -> &'static str {
        match self {
            ActionType::WriteFile => "create or overwrite a file with the full payload",
            ActionType::OpenFile => "read a file's contents",
            ActionType::DeleteFile => "delete an existing file",
            ActionType::EditFile => "change an existing file with a unified diff or full contents",
            ActionType::Completed => "declare the goal achieved",
        }
    }

    pub fn tags() -> Vec<&'static str> {
        Self::ALL.iter().map(|a| a.as_str()).collect()
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionType {
    type Err = GatewayError;

    fn from_str(tag: &str) -> Result<Self> {
        let normalized = tag.trim().to_ascii_uppercase();
        ActionType::ALL
            .into_iter()
            .find(|a| a.as_str() == normalized)
            .ok_or_else(|| GatewayError::UnknownAction(tag.to_string()))
    }
}

/// One proposed action, issued once per round by the proposer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionProposal {
    pub action_type: ActionType,
    pub target: String,
    #[serde(default)]
    pub payload: String,
    pub rationale: String,
}

impl ActionProposal {
    pub fn new(
        action_type: ActionType,
        target: impl Into<String>,
        payload: impl Into<String>,
        rationale: impl Into<String>,
    ) -> Self {
        Self {
            action_type,
            target: target.into(),
            payload: payload.into(),
            rationale: rationale.into(),
        }
    }

    /// The goal-achieved sentinel
    pub fn completed(rationale: impl Into<String>) -> Self {
        Self::new(ActionType::Completed, "", "", rationale)
    }

    /// Check the proposer contract: non-empty rationale, and a target for
    /// everything except COMPLETED.
    pub fn validate(&self) -> Result<()> {
        if self.rationale.trim().is_empty() {
            return Err(GatewayError::Proposal("rationale must not be empty".to_string()));
        }
        if self.action_type != ActionType::Completed && self.target.trim().is_empty() {
            return Err(GatewayError::Proposal(format!(
                "{} requires a target",
                self.action_type
            )));
        }
        Ok(())
    }
}

impl fmt::Display for ActionProposal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.action_type == ActionType::Completed {
            write!(f, "{}", self.action_type)
        } else {
            write!(f, "{} {}", self.action_type, self.target)
        }
    }
}
