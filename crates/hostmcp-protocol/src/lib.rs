//! Shared value types for hostmcp: synthetic call contexts, host responses,
//! the host capability interface, error taxonomy, and MCP wire types.

mod context;
mod error;
mod host;
pub mod rpc;
mod tool;

pub use context::{Attachment, Body, CallContext, MultipartForm};
pub use error::BridgeError;
pub use host::{HOST_API_VERSION, HostCapabilities, HostError, HostOperation, HostResponse};
pub use tool::ToolError;

/// Header used to carry the transport session id.
pub const SESSION_ID_HEADER: &str = "Mcp-Session-Id";
