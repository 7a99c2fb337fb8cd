//! Registry of tool adapters.

use crate::adaptor::ToolAdapter;
use crate::output_policy::ToolOutputPolicy;
use crate::tool::{ToolDefinition, ToolSpec};
use hostmcp_protocol::{BridgeError, HostCapabilities, ToolError};
use hostmcp_runtime::Bridge;
use log::{debug, info, warn};
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Outcome of building a registry from a catalog.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogReport {
    pub registered: Vec<String>,
    /// Skipped tool names with the reason.
    pub skipped: Vec<(String, BridgeError)>,
}

/// Name-keyed set of adapters, shared by the transport.
#[derive(Debug, Default, Clone)]
pub struct ToolRegistry {
    tools: Arc<RwLock<BTreeMap<String, ToolAdapter>>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve each definition against `host` and register the ones it
    /// supports. Unsupported definitions are logged and skipped.
    pub fn from_catalog(
        host: &dyn HostCapabilities,
        definitions: Vec<ToolDefinition>,
        bridge: Bridge,
        policy: Option<Arc<ToolOutputPolicy>>,
    ) -> (Self, CatalogReport) {
        let registry = Self::new();
        let mut report = CatalogReport::default();
        let api_version = host.api_version();
        for definition in definitions {
            let name = definition.name.clone();
            let adapter = match resolve(host, api_version, definition) {
                Ok(adapter) => adapter.with_bridge(bridge),
                Err(err) => {
                    warn!("skipping tool (name={}, reason={})", name, err);
                    report.skipped.push((name, err));
                    continue;
                }
            };
            let adapter = match &policy {
                Some(policy) => adapter.with_output_policy(policy.clone()),
                None => adapter,
            };
            match registry.register(adapter) {
                Ok(()) => report.registered.push(name),
                Err(err) => {
                    warn!("skipping tool (name={}, reason={})", name, err);
                    report.skipped.push((name, err));
                }
            }
        }
        info!(
            "tool catalog loaded (registered={}, skipped={})",
            report.registered.len(),
            report.skipped.len()
        );
        (registry, report)
    }

    /// Register an adapter. A name already present is rejected and the
    /// existing tool stays.
    pub fn register(&self, adapter: ToolAdapter) -> Result<(), BridgeError> {
        let mut tools = self.tools.write();
        if tools.contains_key(adapter.name()) {
            return Err(BridgeError::DuplicateTool(adapter.name().to_string()));
        }
        debug!("registering tool (name={})", adapter.name());
        tools.insert(adapter.name().to_string(), adapter);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<ToolAdapter> {
        self.tools.read().get(name).cloned()
    }

    /// Registered names in sorted order.
    pub fn list(&self) -> Vec<String> {
        self.tools.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.tools.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.read().is_empty()
    }

    pub fn specs(&self) -> Vec<ToolSpec> {
        self.tools.read().values().map(ToolAdapter::spec).collect()
    }

    /// Typed invocation by name. The lock is released before the call.
    pub fn try_invoke(&self, name: &str, args: Value) -> Result<Value, ToolError> {
        let adapter = self
            .get(name)
            .ok_or_else(|| ToolError::ToolNotFound(name.to_string()))?;
        adapter.try_invoke(args)
    }

    /// Invoke by name; unknown names answer with an error object.
    pub fn invoke(&self, name: &str, args: Value) -> Value {
        match self.get(name) {
            Some(adapter) => adapter.invoke(args),
            None => {
                let err = ToolError::ToolNotFound(name.to_string());
                serde_json::json!({ "error": err.to_string() })
            }
        }
    }
}

fn resolve(
    host: &dyn HostCapabilities,
    api_version: u32,
    definition: ToolDefinition,
) -> Result<ToolAdapter, BridgeError> {
    if api_version < definition.min_api_version {
        return Err(BridgeError::UnsupportedOperation(format!(
            "{} needs host api {} (host has {})",
            definition.operation, definition.min_api_version, api_version
        )));
    }
    let operation = host
        .operation(&definition.operation)
        .ok_or_else(|| BridgeError::UnsupportedOperation(definition.operation.clone()))?;
    Ok(ToolAdapter::new(definition, operation))
}
