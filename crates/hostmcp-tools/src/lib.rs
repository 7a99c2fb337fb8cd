//! Tool layer for hostmcp: call context construction, tool definitions and
//! adapters, the registry, and the built-in catalog of host tools.

pub mod adaptor;
pub mod builtins;
pub mod context;
pub mod host;
pub mod output_policy;
pub mod registry;
pub mod tool;

/// Adapter turning a definition plus host operation into a callable tool.
pub use adaptor::ToolAdapter;
/// Built-in catalog and registry helper.
pub use builtins::{builtin_definitions, builtin_tool_registry, enabled_definitions};
/// Synthetic context builder.
pub use context::CallContextBuilder;
/// Host collaborators.
pub use host::{FnOperation, HttpHost, OperationTable};
/// Tool output policy.
pub use output_policy::ToolOutputPolicy;
/// Tool registry and catalog report.
pub use registry::{CatalogReport, ToolRegistry};
/// Tool definition types.
pub use tool::{ContextRecipe, ParamKind, ParamSpec, ResultShape, ToolArgs, ToolDefinition, ToolSpec};
