use async_trait::async_trait;
use hostmcp_protocol::{Body, CallContext, HostError, HostOperation, HostResponse};
use parking_lot::Mutex;
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Answers with the parts of the context it was given.
///
/// A JSON body comes back as-is under `body`; other body forms are
/// summarised.
#[derive(Debug, Clone)]
pub struct EchoOperation {
    name: String,
    body_only: bool,
}

impl EchoOperation {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            body_only: false,
        }
    }

    /// Reply with just the JSON body.
    pub fn body_only(mut self) -> Self {
        self.body_only = true;
        self
    }
}

fn body_value(body: &Body) -> Value {
    match body {
        Body::Empty => Value::Null,
        Body::Json(value) => value.clone(),
        Body::Raw(bytes) => json!({"raw_len": bytes.len()}),
        Body::Multipart(form) => json!({
            "fields": form.fields,
            "attachments": form
                .attachments
                .iter()
                .map(|item| json!({
                    "field": item.field,
                    "filename": item.filename,
                    "len": item.bytes.len(),
                }))
                .collect::<Vec<_>>(),
        }),
    }
}

#[async_trait]
impl HostOperation for EchoOperation {
    fn name(&self) -> &str {
        &self.name
    }

    async fn call(&self, context: CallContext) -> Result<HostResponse, HostError> {
        let body = body_value(context.body());
        if self.body_only {
            return Ok(HostResponse::Json(body));
        }
        Ok(HostResponse::Json(json!({
            "query": context.query(),
            "path": context.path_params(),
            "body": body,
        })))
    }
}

/// Returns a fixed response.
#[derive(Debug, Clone)]
pub struct FixedOperation {
    name: String,
    response: HostResponse,
}

impl FixedOperation {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            response: HostResponse::Json(json!({})),
        }
    }

    pub fn with_result(mut self, result: Value) -> Self {
        self.response = HostResponse::Json(result);
        self
    }

    pub fn with_response(mut self, response: HostResponse) -> Self {
        self.response = response;
        self
    }
}

#[async_trait]
impl HostOperation for FixedOperation {
    fn name(&self) -> &str {
        &self.name
    }

    async fn call(&self, _context: CallContext) -> Result<HostResponse, HostError> {
        Ok(self.response.clone())
    }
}

/// Sleeps on the timer, then answers `"done"`.
#[derive(Debug, Clone)]
pub struct SleepingOperation {
    name: String,
    delay: Duration,
}

impl SleepingOperation {
    pub fn new(name: impl Into<String>, delay: Duration) -> Self {
        Self {
            name: name.into(),
            delay,
        }
    }
}

#[async_trait]
impl HostOperation for SleepingOperation {
    fn name(&self) -> &str {
        &self.name
    }

    async fn call(&self, _context: CallContext) -> Result<HostResponse, HostError> {
        tokio::time::sleep(self.delay).await;
        Ok(HostResponse::Json(json!("done")))
    }
}

/// Holds its thread with `std::thread::sleep`, then answers `"done"`.
#[derive(Debug, Clone)]
pub struct BlockingOperation {
    name: String,
    delay: Duration,
}

impl BlockingOperation {
    pub fn new(name: impl Into<String>, delay: Duration) -> Self {
        Self {
            name: name.into(),
            delay,
        }
    }
}

#[async_trait]
impl HostOperation for BlockingOperation {
    fn name(&self) -> &str {
        &self.name
    }

    async fn call(&self, _context: CallContext) -> Result<HostResponse, HostError> {
        std::thread::sleep(self.delay);
        Ok(HostResponse::Json(json!("done")))
    }
}

/// Increments a shared counter once per call and returns the new value.
#[derive(Debug, Clone)]
pub struct CountingOperation {
    name: String,
    counter: Arc<AtomicU64>,
}

impl CountingOperation {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_counter(name, Arc::new(AtomicU64::new(0)))
    }

    pub fn with_counter(name: impl Into<String>, counter: Arc<AtomicU64>) -> Self {
        Self {
            name: name.into(),
            counter,
        }
    }

    pub fn counter(&self) -> Arc<AtomicU64> {
        self.counter.clone()
    }

    pub fn count(&self) -> u64 {
        self.counter.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HostOperation for CountingOperation {
    fn name(&self) -> &str {
        &self.name
    }

    async fn call(&self, _context: CallContext) -> Result<HostResponse, HostError> {
        tokio::task::yield_now().await;
        let value = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(HostResponse::Json(json!({"count": value})))
    }
}

/// Always fails with the given message.
#[derive(Debug, Clone)]
pub struct FailingOperation {
    name: String,
    message: String,
}

impl FailingOperation {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
        }
    }
}

#[async_trait]
impl HostOperation for FailingOperation {
    fn name(&self) -> &str {
        &self.name
    }

    async fn call(&self, _context: CallContext) -> Result<HostResponse, HostError> {
        Err(HostError::Failed(self.message.clone()))
    }
}

/// Panics inside the operation body.
#[derive(Debug, Clone)]
pub struct PanickingOperation {
    name: String,
}

impl PanickingOperation {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl HostOperation for PanickingOperation {
    fn name(&self) -> &str {
        &self.name
    }

    async fn call(&self, _context: CallContext) -> Result<HostResponse, HostError> {
        panic!("{} exploded", self.name);
    }
}

/// Records every context it receives and answers `{}`.
#[derive(Debug, Clone, Default)]
pub struct RecordingOperation {
    name: String,
    calls: Arc<Mutex<Vec<CallContext>>>,
}

impl RecordingOperation {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            calls: Arc::default(),
        }
    }

    pub fn calls(&self) -> Vec<CallContext> {
        self.calls.lock().clone()
    }

    pub fn last_call(&self) -> Option<CallContext> {
        self.calls.lock().last().cloned()
    }
}

#[async_trait]
impl HostOperation for RecordingOperation {
    fn name(&self) -> &str {
        &self.name
    }

    async fn call(&self, context: CallContext) -> Result<HostResponse, HostError> {
        self.calls.lock().push(context);
        Ok(HostResponse::Json(json!({})))
    }
}
