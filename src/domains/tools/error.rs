//! Tool-specific error types.

use thiserror::Error;

/// Errors that can occur during tool dispatch and execution.
#[derive(Debug, Error)]
pub enum ToolError {
    /// The requested tool was not found in the registry.
    #[error("Tool not found: {0}")]
    NotFound(String),

    /// The arguments did not match the tool's declared input shape.
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// An upstream lookup failed (network error, bad status, or bad body).
    #[error("Upstream service unavailable: {0}")]
    Upstream(String),

    /// The tool execution failed for a non-upstream reason.
    #[error("Execution failed: {0}")]
    ExecutionFailed(String),
}

impl ToolError {
    /// Create a new "not found" error.
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound(name.into())
    }

    /// Create a new "invalid arguments" error.
    pub fn invalid_arguments(msg: impl Into<String>) -> Self {
        Self::InvalidArguments(msg.into())
    }

    /// Create a new "upstream unavailable" error.
    pub fn upstream(msg: impl Into<String>) -> Self {
        Self::Upstream(msg.into())
    }

    /// Create a new "execution failed" error.
    pub fn execution_failed(msg: impl Into<String>) -> Self {
        Self::ExecutionFailed(msg.into())
    }

    /// Whether this error should be reported to the caller as a protocol
    /// error (bad request) rather than a tool execution failure.
    pub fn is_protocol_error(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::InvalidArguments(_))
    }
}
