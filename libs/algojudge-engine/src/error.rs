//! Error types for the grading pipeline.
//!
//! Only [`CompileError`] aborts a whole run. Every [`ExecutionError`] is
//! caught per test case and rendered into that test's `error` field, so each
//! variant's `Display` is the exact text the UI shows.

use thiserror::Error;

/// The transpilation step rejected the submission.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct CompileError {
    pub message: String,
}

impl CompileError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutionError {
    #[error("Could not find function name in code")]
    CallableNotFound,

    /// The submitted code threw.
    #[error("Execution error: {0}")]
    Runtime(String),

    #[error("Time Limit Exceeded: execution did not finish within {timeout_ms}ms")]
    TimeLimitExceeded { timeout_ms: u64 },

    #[error("Cancelled")]
    Cancelled,

    #[error("Execution error: failed to launch `{command}`: {reason}")]
    Launch { command: String, reason: String },

    /// The runtime exited without producing a readable result envelope.
    #[error("Execution error: {0}")]
    Protocol(String),

    #[error("Source code exceeds maximum size of {limit} bytes")]
    SourceTooLarge { limit: usize },

    #[error("Test input exceeds maximum size of {limit} bytes")]
    InputTooLarge { limit: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_visible_prefixes() {
        assert_eq!(
            ExecutionError::Runtime("boom".into()).to_string(),
            "Execution error: boom"
        );
        assert_eq!(
            ExecutionError::CallableNotFound.to_string(),
            "Could not find function name in code"
        );
        assert_eq!(CompileError::new("Unexpected token").to_string(), "Unexpected token");
        assert!(ExecutionError::TimeLimitExceeded { timeout_ms: 50 }
            .to_string()
            .contains("50ms"));
    }
}
