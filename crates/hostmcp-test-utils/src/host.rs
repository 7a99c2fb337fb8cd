use hostmcp_protocol::{HOST_API_VERSION, HostCapabilities, HostOperation};
use std::collections::BTreeMap;
use std::sync::Arc;

/// In-memory host with a fixed operation set.
#[derive(Clone)]
pub struct FakeHost {
    api_version: u32,
    operations: BTreeMap<String, Arc<dyn HostOperation>>,
}

impl Default for FakeHost {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for FakeHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FakeHost")
            .field("api_version", &self.api_version)
            .field("operations", &self.operations.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl FakeHost {
    pub fn new() -> Self {
        Self {
            api_version: HOST_API_VERSION,
            operations: BTreeMap::new(),
        }
    }

    pub fn with_api_version(mut self, version: u32) -> Self {
        self.api_version = version;
        self
    }

    /// Register `operation` under its own name.
    pub fn with_operation(self, operation: impl HostOperation + 'static) -> Self {
        let name = operation.name().to_string();
        self.with_named(name, Arc::new(operation))
    }

    /// Register `operation` under `name`, regardless of what it calls itself.
    pub fn with_named(mut self, name: impl Into<String>, operation: Arc<dyn HostOperation>) -> Self {
        self.operations.insert(name.into(), operation);
        self
    }
}

impl HostCapabilities for FakeHost {
    fn api_version(&self) -> u32 {
        self.api_version
    }

    fn operation(&self, name: &str) -> Option<Arc<dyn HostOperation>> {
        self.operations.get(name).cloned()
    }

    fn operation_names(&self) -> Vec<String> {
        self.operations.keys().cloned().collect()
    }
}
