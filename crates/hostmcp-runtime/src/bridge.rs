//! Run async host operations to completion from synchronous callers.
//!
//! Two paths, picked per call:
//! - no scheduler on the calling thread: build a throwaway runtime with a
//!   single worker, spawn the operation onto it and wait on a channel;
//! - a scheduler is already driving this thread: hand the operation to a
//!   fresh worker thread with its own runtime and wait on a channel.
//!
//! Either way the caller waits with `recv_timeout`, so an operation that
//! blocks its thread cannot hold the caller past the deadline. On expiry the
//! caller gets [`BridgeError::Timeout`]; the host operation is not cancelled
//! and a late result is dropped.

use futures_util::FutureExt;
use hostmcp_protocol::{BridgeError, CallContext, HostOperation, HostResponse};
use log::{debug, warn};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;
use tokio::runtime::{Builder, Handle, Runtime};

/// Timeout applied when a caller does not pick one.
pub const DEFAULT_BRIDGE_TIMEOUT: Duration = Duration::from_secs(30);

/// Execute `operation` with `context`, blocking the caller for at most `timeout`.
pub fn call_async(
    operation: Arc<dyn HostOperation>,
    context: CallContext,
    timeout: Duration,
) -> Result<HostResponse, BridgeError> {
    BridgeCall::new(operation, context, timeout).run()
}

/// Bridge with a default timeout, shared by tool adapters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bridge {
    timeout: Duration,
}

impl Default for Bridge {
    fn default() -> Self {
        Self::new(DEFAULT_BRIDGE_TIMEOUT)
    }
}

impl Bridge {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Call with the bridge's default timeout.
    pub fn call(
        &self,
        operation: Arc<dyn HostOperation>,
        context: CallContext,
    ) -> Result<HostResponse, BridgeError> {
        call_async(operation, context, self.timeout)
    }

    /// Call with an explicit timeout, falling back to the default when `None`.
    pub fn call_with_timeout(
        &self,
        operation: Arc<dyn HostOperation>,
        context: CallContext,
        timeout: Option<Duration>,
    ) -> Result<HostResponse, BridgeError> {
        call_async(operation, context, timeout.unwrap_or(self.timeout))
    }
}

/// One pending invocation. Consumed by [`BridgeCall::run`].
pub struct BridgeCall {
    operation: Arc<dyn HostOperation>,
    context: CallContext,
    timeout: Duration,
}

impl std::fmt::Debug for BridgeCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeCall")
            .field("operation", &self.operation.name())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl BridgeCall {
    pub fn new(operation: Arc<dyn HostOperation>, context: CallContext, timeout: Duration) -> Self {
        Self {
            operation,
            context,
            timeout,
        }
    }

    pub fn run(self) -> Result<HostResponse, BridgeError> {
        if Handle::try_current().is_ok() {
            debug!(
                "scheduler active on caller; dispatching to worker (operation={})",
                self.operation.name()
            );
            self.run_on_worker()
        } else {
            debug!(
                "no scheduler on caller; running inline (operation={})",
                self.operation.name()
            );
            self.run_inline()
        }
    }

    fn run_inline(self) -> Result<HostResponse, BridgeError> {
        let BridgeCall {
            operation,
            context,
            timeout,
        } = self;
        let name = operation.name().to_string();
        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name(format!("hostmcp-bridge-{name}"))
            .enable_all()
            .build()
            .map_err(runtime_error)?;
        let (tx, rx) = mpsc::sync_channel(1);
        runtime.spawn(async move {
            let _ = tx.send(drive(operation, context, timeout).await);
        });
        let result = wait_for(&rx, timeout, &name);
        runtime.shutdown_background();
        result
    }

    fn run_on_worker(self) -> Result<HostResponse, BridgeError> {
        let BridgeCall {
            operation,
            context,
            timeout,
        } = self;
        let name = operation.name().to_string();
        let (tx, rx) = mpsc::sync_channel(1);

        thread::Builder::new()
            .name(format!("hostmcp-bridge-{name}"))
            .spawn(move || {
                let result = current_thread_runtime().and_then(|runtime| {
                    let result = runtime.block_on(drive(operation, context, timeout));
                    runtime.shutdown_background();
                    result
                });
                // The caller may have timed out and dropped the receiver.
                let _ = tx.send(result);
            })
            .map_err(|err| {
                BridgeError::OperationFailed(format!("failed to spawn bridge worker: {err}"))
            })?;

        wait_for(&rx, timeout, &name)
    }
}

type Outcome = Result<HostResponse, BridgeError>;

/// Block the caller on `rx` for at most `timeout`.
fn wait_for(rx: &Receiver<Outcome>, timeout: Duration, name: &str) -> Outcome {
    match rx.recv_timeout(timeout) {
        Ok(result) => result,
        Err(RecvTimeoutError::Timeout) => {
            warn!(
                "bridge call abandoned after timeout (operation={}, timeout_ms={})",
                name,
                timeout.as_millis()
            );
            Err(BridgeError::Timeout(timeout))
        }
        Err(RecvTimeoutError::Disconnected) => Err(BridgeError::OperationFailed(format!(
            "bridge worker for {name} exited without a result"
        ))),
    }
}

fn runtime_error(err: std::io::Error) -> BridgeError {
    BridgeError::OperationFailed(format!("failed to start runtime: {err}"))
}

fn current_thread_runtime() -> Result<Runtime, BridgeError> {
    Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(runtime_error)
}

/// Await the operation under `timeout`, folding host errors and panics into
/// [`BridgeError`].
async fn drive(
    operation: Arc<dyn HostOperation>,
    context: CallContext,
    timeout: Duration,
) -> Result<HostResponse, BridgeError> {
    let call = AssertUnwindSafe(operation.call(context)).catch_unwind();
    match tokio::time::timeout(timeout, call).await {
        Ok(Ok(Ok(response))) => Ok(response),
        Ok(Ok(Err(err))) => Err(BridgeError::OperationFailed(err.to_string())),
        Ok(Err(panic)) => Err(BridgeError::OperationFailed(format!(
            "{} panicked: {}",
            operation.name(),
            panic_message(panic.as_ref())
        ))),
        Err(_) => {
            warn!(
                "host operation timed out (operation={}, timeout_ms={})",
                operation.name(),
                timeout.as_millis()
            );
            Err(BridgeError::Timeout(timeout))
        }
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hostmcp_test_utils::{
        BlockingOperation, EchoOperation, FailingOperation, PanickingOperation, SleepingOperation,
    };
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::time::Instant;

    fn context() -> CallContext {
        CallContext::default()
    }

    #[test]
    fn inline_path_returns_result() {
        let op = Arc::new(SleepingOperation::new("slow", Duration::from_millis(10)));
        let response = call_async(op, context(), Duration::from_secs(5)).expect("response");
        assert_eq!(response, HostResponse::Json(json!("done")));
    }

    #[test]
    fn host_error_becomes_operation_failed() {
        let op = Arc::new(FailingOperation::new("broken", "host exploded"));
        let err = call_async(op, context(), Duration::from_secs(5)).unwrap_err();
        assert_eq!(err, BridgeError::OperationFailed("host exploded".to_string()));
    }

    #[test]
    fn panic_becomes_operation_failed() {
        let op = Arc::new(PanickingOperation::new("boom"));
        let err = call_async(op, context(), Duration::from_secs(5)).unwrap_err();
        match err {
            BridgeError::OperationFailed(message) => assert!(message.contains("boom")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn inline_path_times_out() {
        let op = Arc::new(SleepingOperation::new("stuck", Duration::from_secs(10)));
        let started = Instant::now();
        let err = call_async(op, context(), Duration::from_millis(200)).unwrap_err();
        assert!(err.is_timeout());
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn inline_path_times_out_when_operation_blocks_its_thread() {
        let op = Arc::new(BlockingOperation::new("stuck", Duration::from_secs(3)));
        let started = Instant::now();
        let err = call_async(op, context(), Duration::from_millis(300)).unwrap_err();
        let elapsed = started.elapsed();
        assert_eq!(err, BridgeError::Timeout(Duration::from_millis(300)));
        assert!(elapsed < Duration::from_millis(1500), "{elapsed:?}");
    }

    #[tokio::test(flavor = "current_thread")]
    async fn worker_path_times_out_when_operation_blocks_its_thread() {
        let op = Arc::new(BlockingOperation::new("stuck", Duration::from_secs(3)));
        let started = Instant::now();
        let err = call_async(op, context(), Duration::from_millis(300)).unwrap_err();
        assert!(err.is_timeout());
        assert!(started.elapsed() < Duration::from_millis(1500));
    }

    #[test]
    fn blocking_operation_within_budget_returns_result() {
        let op = Arc::new(BlockingOperation::new("short", Duration::from_millis(20)));
        let response = call_async(op, context(), Duration::from_secs(5)).expect("response");
        assert_eq!(response, HostResponse::Json(json!("done")));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn worker_path_on_current_thread_scheduler() {
        let op = Arc::new(EchoOperation::new("echo"));
        let response = Bridge::default().call(op, context()).expect("response");
        assert_eq!(
            response,
            HostResponse::Json(json!({"query": {}, "path": {}, "body": null}))
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn worker_path_matches_inline_path() {
        let op = Arc::new(SleepingOperation::new("slow", Duration::from_millis(10)));
        let on_worker = call_async(op.clone(), context(), Duration::from_secs(5)).expect("worker");
        let inline = thread::spawn(move || call_async(op, context(), Duration::from_secs(5)))
            .join()
            .expect("join")
            .expect("inline");
        assert_eq!(on_worker, inline);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn worker_path_times_out() {
        let op = Arc::new(SleepingOperation::new("stuck", Duration::from_secs(10)));
        let started = Instant::now();
        let err = Bridge::new(Duration::from_millis(200))
            .call(op, context())
            .unwrap_err();
        assert_eq!(err, BridgeError::Timeout(Duration::from_millis(200)));
        assert!(started.elapsed() < Duration::from_secs(2));
    }
}
