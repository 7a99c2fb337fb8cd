//! Host capability interface.
//!
//! The host owns its operations; this layer only looks them up by name and
//! invokes them. A host advertises what it supports through
//! [`HostCapabilities`] instead of being probed at call time.

use crate::CallContext;
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Version of the capability interface implemented by this crate.
pub const HOST_API_VERSION: u32 = 1;

/// Response produced by a host operation.
#[derive(Debug, Clone, PartialEq)]
pub enum HostResponse {
    /// Structured JSON-compatible value.
    Json(Value),
    /// Raw bytes (images, previews) tagged with content type and status.
    Binary {
        status: u16,
        content_type: String,
        bytes: Vec<u8>,
    },
}

impl HostResponse {
    pub fn json(value: Value) -> Self {
        HostResponse::Json(value)
    }

    pub fn binary(status: u16, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        HostResponse::Binary {
            status,
            content_type: content_type.into(),
            bytes,
        }
    }
}

/// Failure raised inside a host operation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HostError {
    #[error("{0}")]
    Failed(String),
    #[error("host returned status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("decode error: {0}")]
    Decode(String),
}

/// One named asynchronous capability of the host.
#[async_trait]
pub trait HostOperation: Send + Sync {
    /// Operation name as advertised by the host.
    fn name(&self) -> &str;

    /// Run the operation against a synthetic context.
    async fn call(&self, context: CallContext) -> Result<HostResponse, HostError>;
}

impl fmt::Debug for dyn HostOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostOperation")
            .field("name", &self.name())
            .finish()
    }
}

/// Versioned catalog of host operations.
pub trait HostCapabilities: Send + Sync {
    /// Capability interface version implemented by the host.
    fn api_version(&self) -> u32;

    /// Resolve an operation by name.
    fn operation(&self, name: &str) -> Option<Arc<dyn HostOperation>>;

    /// Names of every operation the host provides.
    fn operation_names(&self) -> Vec<String>;

    fn supports(&self, name: &str) -> bool {
        self.operation(name).is_some()
    }
}
