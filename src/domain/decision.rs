//! Gate decisions issued by the evaluator.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Binary verdict on a proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    #[serde(alias = "approve", alias = "accept", alias = "approved", alias = "ACCEPT")]
    Approve,
    #[serde(alias = "decline", alias = "reject", alias = "declined", alias = "REJECT")]
    Decline,
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::Approve => f.write_str("APPROVE"),
            Decision::Decline => f.write_str("DECLINE"),
        }
    }
}

/// The evaluator's answer for one round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateDecision {
    pub decision: Decision,
    #[serde(default, alias = "reason")]
    pub rationale: String,
}

impl GateDecision {
    pub fn approve(rationale: impl Into<String>) -> Self {
        Self {
            decision: Decision::Approve,
            rationale: rationale.into(),
        }
    }

    pub fn decline(rationale: impl Into<String>) -> Self {
        Self {
            decision: Decision::Decline,
            rationale: rationale.into(),
        }
    }

    pub fn is_approved(&self) -> bool {
        self.decision == Decision::Approve
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors() {
        assert!(GateDecision::approve("fine").is_approved());
        assert!(!GateDecision::decline("no").is_approved());
    }

    #[test]
    fn test_deserialize_aliases() {
        let d: GateDecision =
            serde_json::from_str(r#"{"decision": "accept", "reason": "looks safe"}"#).unwrap();
        assert_eq!(d.decision, Decision::Approve);
        assert_eq!(d.rationale, "looks safe");

        let d: GateDecision =
            serde_json::from_str(r#"{"decision": "DECLINE", "rationale": "deletes tests"}"#).unwrap();
        assert_eq!(d.decision, Decision::Decline);
    }

    #[test]
    fn test_display() {
        assert_eq!(Decision::Approve.to_string(), "APPROVE");
        assert_eq!(Decision::Decline.to_string(), "DECLINE");
    }
}
