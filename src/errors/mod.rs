//! Error kinds shared across the runtime.
//!
//! Use [`SreError`] at module boundaries (agent responses, the message
//! bus, the inventory guard). Internal/leaf functions can continue using
//! `anyhow::Result`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SreError {
    #[error("operation timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("agent not initialized")]
    NotInitialized,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("skipped: {0}")]
    Skipped(String),

    #[error("preflight failed: {reason}")]
    PreflightFailed { reason: String, suggestion: String },

    #[error("needs user input: {0}")]
    NeedsUserInput(String),

    #[error("transport error: {0}")]
    TransportError(String),

    #[error("execution error: {0}")]
    ExecutionError(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl SreError {
    /// Whether `BaseAgent::execute_with_retry` should attempt another try.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout(_) | Self::NotInitialized => false,
            Self::NotFound(_) | Self::Skipped(_) | Self::PreflightFailed { .. } => false,
            Self::NeedsUserInput(_) => false,
            Self::TransportError(_) | Self::ExecutionError(_) | Self::Internal(_) => true,
        }
    }

    /// The `error_type` string surfaced in a `BaseAgent` response, mirroring
    /// `class_of(exc)` from the handle-request algorithm.
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::Timeout(_) => "timeout",
            Self::NotInitialized => "not_initialized",
            Self::NotFound(_) => "not_found",
            Self::Skipped(_) => "skipped",
            Self::PreflightFailed { .. } => "preflight_failed",
            Self::NeedsUserInput(_) => "needs_user_input",
            Self::TransportError(_) => "transport_error",
            Self::ExecutionError(_) => "execution_error",
            Self::Internal(_) => "internal_error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_is_not_retryable() {
        assert!(!SreError::Timeout(std::time::Duration::from_secs(1)).is_retryable());
    }

    #[test]
    fn transport_error_is_retryable() {
        assert!(SreError::TransportError("boom".into()).is_retryable());
    }

    #[test]
    fn error_type_matches_kind() {
        assert_eq!(SreError::NotFound("x".into()).error_type(), "not_found");
        assert_eq!(
            SreError::PreflightFailed {
                reason: "r".into(),
                suggestion: "s".into()
            }
            .error_type(),
            "preflight_failed"
        );
    }
}
