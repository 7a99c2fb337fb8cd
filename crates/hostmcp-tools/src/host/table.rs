use async_trait::async_trait;
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use hostmcp_protocol::{
    CallContext, HOST_API_VERSION, HostCapabilities, HostError, HostOperation, HostResponse,
};
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

type Handler =
    Arc<dyn Fn(CallContext) -> BoxFuture<'static, Result<HostResponse, HostError>> + Send + Sync>;

/// Host operation backed by an async closure.
#[derive(Clone)]
pub struct FnOperation {
    name: String,
    handler: Handler,
}

impl fmt::Debug for FnOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnOperation")
            .field("name", &self.name)
            .finish()
    }
}

impl FnOperation {
    pub fn new<F, Fut>(name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(CallContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<HostResponse, HostError>> + Send + 'static,
    {
        Self {
            name: name.into(),
            handler: Arc::new(move |context| handler(context).boxed()),
        }
    }
}

#[async_trait]
impl HostOperation for FnOperation {
    fn name(&self) -> &str {
        &self.name
    }

    async fn call(&self, context: CallContext) -> Result<HostResponse, HostError> {
        (self.handler)(context).await
    }
}

/// In-process capability table for embedders that own their operations.
#[derive(Clone)]
pub struct OperationTable {
    api_version: u32,
    operations: BTreeMap<String, Arc<dyn HostOperation>>,
}

impl Default for OperationTable {
    fn default() -> Self {
        Self {
            api_version: HOST_API_VERSION,
            operations: BTreeMap::new(),
        }
    }
}

impl fmt::Debug for OperationTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationTable")
            .field("api_version", &self.api_version)
            .field("operations", &self.operations.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl OperationTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_api_version(mut self, version: u32) -> Self {
        self.api_version = version;
        self
    }

    /// Add `operation` under its own name, replacing any previous entry.
    pub fn insert(&mut self, operation: Arc<dyn HostOperation>) {
        self.operations
            .insert(operation.name().to_string(), operation);
    }

    pub fn with(mut self, operation: impl HostOperation + 'static) -> Self {
        self.insert(Arc::new(operation));
        self
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

impl HostCapabilities for OperationTable {
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
