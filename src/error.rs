//! Error types for babysitter
//!
//! Centralized error handling using thiserror. Inside the gateway every one of
//! these is converted into an `ExecutionResult { ok: false, .. }`; only setup
//! errors ever leave `ApprovalLoop::run`.

use std::time::Duration;

use thiserror::Error;

/// All error types that can occur in babysitter
#[derive(Debug, Error)]
pub enum GatewayError {
    /// A target resolved outside the repository root
    #[error("Unsafe path detected")]
    PathTraversal { target: String },

    /// Edit or delete of a target that does not exist
    #[error("{reason}")]
    TargetNotFound { target: String, reason: &'static str },

    /// Write or edit aimed at a directory, including the root itself
    #[error("Target is a directory")]
    NotAFile { target: String },

    /// Action tag outside the known set
    #[error("Unknown action_type: {0}")]
    UnknownAction(String),

    /// A unified diff that cannot be applied to the current file
    #[error("Patch does not apply: {0}")]
    Patch(String),

    /// Proposer returned something that violates the proposal contract
    #[error("Invalid proposal: {0}")]
    Proposal(String),

    /// LLM API error
    #[error("LLM error: {0}")]
    Llm(String),

    /// External call exceeded its deadline
    #[error("{call} timed out after {timeout:?}")]
    Timeout { call: &'static str, timeout: Duration },

    /// Bad session setup or configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl GatewayError {
    pub fn file_missing(target: impl Into<String>) -> Self {
        GatewayError::TargetNotFound {
            target: target.into(),
            reason: "File does not exist",
        }
    }

    pub fn edit_target_missing(target: impl Into<String>) -> Self {
        GatewayError::TargetNotFound {
            target: target.into(),
            reason: "File to edit does not exist",
        }
    }
}

/// Result type alias for babysitter operations
pub type Result<T> = std::result::Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_traversal_message() {
        let err = GatewayError::PathTraversal {
            target: "../etc/passwd".to_string(),
        };
        assert_eq!(err.to_string(), "Unsafe path detected");
    }

    #[test]
    fn test_target_not_found_messages() {
        assert_eq!(GatewayError::file_missing("a.txt").to_string(), "File does not exist");
        assert_eq!(
            GatewayError::edit_target_missing("a.txt").to_string(),
            "File to edit does not exist"
        );
    }

    #[test]
    fn test_not_a_file_message() {
        let err = GatewayError::NotAFile { target: ".".to_string() };
        assert_eq!(err.to_string(), "Target is a directory");
    }

    #[test]
    fn test_unknown_action_message() {
        let err = GatewayError::UnknownAction("run_shell".to_string());
        assert_eq!(err.to_string(), "Unknown action_type: run_shell");
    }

    #[test]
    fn test_timeout_message() {
        let err = GatewayError::Timeout {
            call: "proposer",
            timeout: Duration::from_secs(2),
        };
        assert_eq!(err.to_string(), "proposer timed out after 2s");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "permission denied");
        let err: GatewayError = io_err.into();
        assert!(matches!(err, GatewayError::Io(_)));
        assert!(err.to_string().contains("permission denied"));
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid").unwrap_err();
        let err: GatewayError = json_err.into();
        assert!(matches!(err, GatewayError::Json(_)));
    }
}
