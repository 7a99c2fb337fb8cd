//! Built-in tool catalog covering the host's HTTP routes.

mod files;
mod history;
mod system;
mod workflow;

use crate::output_policy::ToolOutputPolicy;
use crate::registry::{CatalogReport, ToolRegistry};
use crate::tool::ToolDefinition;
use hostmcp_config::ToolsConfig;
use hostmcp_protocol::HostCapabilities;
use hostmcp_runtime::Bridge;
use log::debug;
use std::sync::Arc;

/// Every built-in definition, grouped workflow, history, files, system.
pub fn builtin_definitions() -> Vec<ToolDefinition> {
    let mut definitions = workflow::definitions();
    definitions.extend(history::definitions());
    definitions.extend(files::definitions());
    definitions.extend(system::definitions());
    definitions
}

/// Built-in definitions minus the names listed in `disabled`.
pub fn enabled_definitions(disabled: &[String]) -> Vec<ToolDefinition> {
    builtin_definitions()
        .into_iter()
        .filter(|definition| {
            let off = disabled.iter().any(|name| name == &definition.name);
            if off {
                debug!("tool disabled by config (name={})", definition.name);
            }
            !off
        })
        .collect()
}

/// Build a registry of the built-in tools `host` supports.
pub fn builtin_tool_registry(
    host: &dyn HostCapabilities,
    config: &ToolsConfig,
    bridge: Bridge,
) -> (ToolRegistry, CatalogReport) {
    let policy = Arc::new(ToolOutputPolicy::from(config.output_policy.clone()));
    ToolRegistry::from_catalog(
        host,
        enabled_definitions(&config.disabled),
        bridge,
        Some(policy),
    )
}
