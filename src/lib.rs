//! Babysitter - an approval gateway for agent-proposed file changes
//!
//! A proposer suggests one filesystem action per round, an independent
//! evaluator approves or declines it, and only approved actions reach the
//! sandboxed executor, which can never touch anything outside the repository
//! root.

pub mod agent;
pub mod config;
pub mod domain;
pub mod error;
pub mod gateway;
pub mod id;
pub mod llm;
pub mod prompt;
pub mod runner;
pub mod snapshot;

pub use error::{GatewayError, Result};
