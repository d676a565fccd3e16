//! Runner module - the approval loop that drives a session.

mod approval_loop;

pub use approval_loop::{ApprovalLoop, LoopConfig, SessionReport};
