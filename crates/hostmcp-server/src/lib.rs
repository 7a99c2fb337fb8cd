//! MCP transport for a hostmcp tool registry: streamable HTTP and legacy
//! SSE over axum, with a configurable CORS policy.

mod cors;
mod error;
mod handler;
mod routes;
mod server;
mod session;

pub use cors::cors_layer;
pub use error::ServerError;
pub use handler::McpHandler;
pub use server::{ServerHandle, ToolServer};
