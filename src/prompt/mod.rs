//! Prompt rendering for the proposer and evaluator agents

mod render;
pub mod templates;

pub use render::{GATE, PROPOSER, PromptRenderer};
