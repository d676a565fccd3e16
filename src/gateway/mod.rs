//! Action gateway
//!
//! - `confine`: maps a proposed target to a path under the repository root
//! - `patch`: turns a payload into final file content
//! - `executor`: performs one action and reports what happened

pub mod confine;
pub mod executor;
pub mod patch;

pub use confine::confine;
pub use executor::SandboxedExecutor;
