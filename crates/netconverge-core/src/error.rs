//! Error types for configuration sessions and convergence
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

use crate::types::ReconcileStage;

/// Result type alias for netconverge operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for configuration sessions
#[derive(Error, Debug)]
pub enum Error {
    /// The rendered template produced zero configuration lines
    #[error("Render error: {0}")]
    Render(String),

    /// A transport call through the command executor failed
    #[error("Execution of {operation} failed: {message}")]
    Execution {
        /// Operation name passed to the executor
        operation: String,
        /// Error message reported by the executor
        message: String,
    },

    /// Device-side diff reported failure (Junos)
    #[error("Diff error: {0}")]
    Diff(String),

    /// Illegal session lifecycle transition
    #[error("Session state error: {0}")]
    SessionState(String),

    /// Load completed but the device flagged the candidate as invalid
    #[error("Load rejected by device: {0}")]
    LoadRejected(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// No backend exists for the device metadata
    #[error("Unsupported vendor: {0}")]
    UnsupportedVendor(String),

    /// A reconciliation pass ended in the failed state
    #[error("Reconciliation failed during {stage}: {source}")]
    Reconcile {
        /// Stage at which the pass failed
        stage: ReconcileStage,
        /// Raw device output captured before the failure
        device_output: String,
        /// Underlying cause
        #[source]
        source: Box<Error>,
    },

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// File system errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a render error
    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    /// Create an execution error for the given operation
    pub fn execution(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Execution {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Create a diff error
    pub fn diff(msg: impl Into<String>) -> Self {
        Self::Diff(msg.into())
    }

    /// Create a session state error
    pub fn session_state(msg: impl Into<String>) -> Self {
        Self::SessionState(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create an unsupported vendor error
    pub fn unsupported_vendor(msg: impl Into<String>) -> Self {
        Self::UnsupportedVendor(msg.into())
    }

    /// Wrap an error as a failed reconciliation pass
    pub fn reconcile(stage: ReconcileStage, device_output: impl Into<String>, source: Error) -> Self {
        Self::Reconcile {
            stage,
            device_output: device_output.into(),
            source: Box::new(source),
        }
    }

    /// Whether this error came from the transport
    pub fn is_execution(&self) -> bool {
        matches!(self, Self::Execution { .. })
    }

    /// The innermost cause, looking through [`Error::Reconcile`]
    pub fn root(&self) -> &Error {
        match self {
            Self::Reconcile { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_unwraps_reconcile() {
        let err = Error::reconcile(
            ReconcileStage::Diff,
            "partial output",
            Error::diff("rpc reported failure"),
        );

        assert!(matches!(err.root(), Error::Diff(_)));
        assert!(err.to_string().contains("diff"));
    }

    #[test]
    fn test_execution_display() {
        let err = Error::execution("netmiko.send_config", "connection reset");
        assert!(err.is_execution());
        assert_eq!(
            err.to_string(),
            "Execution of netmiko.send_config failed: connection reset"
        );
    }
}
