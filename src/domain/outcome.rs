//! Session outcome types.
//!
//! This module defines how an approval loop ends.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Terminal outcome of an approval loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopOutcome {
    /// Evaluator approved a COMPLETED proposal
    Completed,
    /// Round budget ran out before completion
    Exhausted,
}

impl LoopOutcome {
    /// Exhaustion is escalated to a human rather than retried
    pub fn requires_review(&self) -> bool {
        matches!(self, LoopOutcome::Exhausted)
    }
}

impl fmt::Display for LoopOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoopOutcome::Completed => f.write_str("COMPLETED"),
            LoopOutcome::Exhausted => f.write_str("EXHAUSTED"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loop_outcome_variants() {
        assert_eq!(LoopOutcome::Completed, LoopOutcome::Completed);
        assert_ne!(LoopOutcome::Completed, LoopOutcome::Exhausted);
    }

    #[test]
    fn test_requires_review() {
        assert!(LoopOutcome::Exhausted.requires_review());
        assert!(!LoopOutcome::Completed.requires_review());
    }

    #[test]
    fn test_display() {
        assert_eq!(LoopOutcome::Completed.to_string(), "COMPLETED");
        assert_eq!(LoopOutcome::Exhausted.to_string(), "EXHAUSTED");
    }
}
