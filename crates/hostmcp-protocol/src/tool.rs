use crate::BridgeError;

/// Errors returned by tool adapters and the registry.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// Tool name was not found in registry.
    #[error("tool not found: {0}")]
    ToolNotFound(String),
    /// Tool received invalid arguments.
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
    /// Shaping the host response failed.
    #[error("execution failed: {0}")]
    ExecutionFailed(String),
    /// The bridge call failed.
    #[error(transparent)]
    Bridge(#[from] BridgeError),
}
