//! Bridge error taxonomy shared by the bridge, adapters and registry.

use std::time::Duration;
use thiserror::Error;

/// Uniform error shape produced below the tool boundary.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BridgeError {
    /// The wait for the host operation expired; its outcome is discarded.
    #[error("timeout after {}ms", .0.as_millis())]
    Timeout(Duration),
    /// The host operation failed or panicked.
    #[error("operation failed: {0}")]
    OperationFailed(String),
    /// The caller supplied a context that cannot be built.
    #[error("invalid context: {0}")]
    InvalidContext(String),
    /// A tool with this name is already registered.
    #[error("duplicate tool: {0}")]
    DuplicateTool(String),
    /// The host does not provide the named capability.
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),
}

impl BridgeError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, BridgeError::Timeout(_))
    }
}
