//! Domain types for babysitter
//!
//! This module contains the records that flow through one approval round:
//! - ActionType / ActionProposal: what the proposer asks for
//! - GateDecision: what the evaluator says about it
//! - ExecutionResult: what the executor did
//! - Session / LoopState: the loop's own bookkeeping
//! - RoundRecord / LoopEvent: the audit transcript

pub mod action;
pub mod decision;
pub mod event;
pub mod execution;
pub mod outcome;
pub mod session;

pub use action::{ActionProposal, ActionType};
pub use decision::{Decision, GateDecision};
pub use event::{LoopEvent, RoundRecord};
pub use execution::ExecutionResult;
pub use outcome::LoopOutcome;
pub use session::{LoopState, Session};
