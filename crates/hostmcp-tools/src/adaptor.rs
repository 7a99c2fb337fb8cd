//! Exposes one host operation as a synchronous tool.

use crate::output_policy::ToolOutputPolicy;
use crate::tool::{ResultShape, ToolArgs, ToolDefinition, ToolSpec};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hostmcp_protocol::{HostOperation, HostResponse, ToolError};
use hostmcp_runtime::Bridge;
use log::{debug, warn};
use serde_json::{Value, json};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

/// Binds a [`ToolDefinition`] to the operation it calls.
#[derive(Clone)]
pub struct ToolAdapter {
    definition: Arc<ToolDefinition>,
    operation: Arc<dyn HostOperation>,
    bridge: Bridge,
    policy: Option<Arc<ToolOutputPolicy>>,
}

impl fmt::Debug for ToolAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolAdapter")
            .field("name", &self.definition.name)
            .field("operation", &self.operation.name())
            .field("timeout", &self.definition.timeout.unwrap_or(self.bridge.timeout()))
            .finish()
    }
}

impl ToolAdapter {
    pub fn new(definition: ToolDefinition, operation: Arc<dyn HostOperation>) -> Self {
        Self {
            definition: Arc::new(definition),
            operation,
            bridge: Bridge::default(),
            policy: None,
        }
    }

    pub fn with_bridge(mut self, bridge: Bridge) -> Self {
        self.bridge = bridge;
        self
    }

    pub fn with_output_policy(mut self, policy: Arc<ToolOutputPolicy>) -> Self {
        self.policy = Some(policy);
        self
    }

    pub fn name(&self) -> &str {
        &self.definition.name
    }

    pub fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    pub fn spec(&self) -> ToolSpec {
        self.definition.spec()
    }

    /// Run the tool. Every failure, including a panic, comes back as
    /// `{"error": "<message>"}`.
    pub fn invoke(&self, args: Value) -> Value {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.try_invoke(args)));
        let message = match outcome {
            Ok(Ok(value)) => return value,
            Ok(Err(err)) => err.to_string(),
            Err(payload) => panic_text(payload.as_ref()),
        };
        warn!(
            "tool call failed (name={}, error={})",
            self.definition.name, message
        );
        let message = if message.trim().is_empty() {
            format!("tool {} failed", self.definition.name)
        } else {
            message
        };
        json!({ "error": message })
    }

    /// Coerce arguments, build the context, call through the bridge and
    /// shape the response.
    pub fn try_invoke(&self, args: Value) -> Result<Value, ToolError> {
        let started = Instant::now();
        let args = ToolArgs::coerce(&self.definition.params, args)?;
        let context = (self.definition.recipe)(&args)?.build()?;
        let response = self.bridge.call_with_timeout(
            self.operation.clone(),
            context,
            self.definition.timeout,
        )?;
        let shaped = self.shape(&args, response)?;
        debug!(
            "tool call finished (name={}, elapsed_ms={})",
            self.definition.name,
            started.elapsed().as_millis()
        );
        Ok(shaped)
    }

    fn shape(&self, args: &ToolArgs, response: HostResponse) -> Result<Value, ToolError> {
        if let HostResponse::Binary { status, .. } = &response {
            if !(200..300).contains(status) {
                return Err(ToolError::ExecutionFailed(format!(
                    "host returned status {status}"
                )));
            }
        }
        let value = match (&self.definition.shape, response) {
            (ResultShape::Acknowledge(template), _) => json!({
                "status": "success",
                "message": args.render(template),
            }),
            (ResultShape::Bytes, HostResponse::Binary { bytes, .. }) => {
                Value::String(STANDARD.encode(bytes))
            }
            (ResultShape::Keyed(key), HostResponse::Json(value)) => {
                json!({ key.as_str(): self.limit(value) })
            }
            (ResultShape::Stringify, HostResponse::Json(value)) => {
                Value::String(self.limit(value).to_string())
            }
            (_, HostResponse::Json(value)) => self.limit(value),
            (
                _,
                HostResponse::Binary {
                    content_type,
                    bytes,
                    ..
                },
            ) => json!({
                "status": "success",
                "content_type": content_type,
                "content_length": bytes.len(),
            }),
        };
        Ok(value)
    }

    fn limit(&self, value: Value) -> Value {
        match &self.policy {
            Some(policy) => policy.apply(value),
            None => value,
        }
    }
}

fn panic_text(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        format!("tool panicked: {text}")
    } else if let Some(text) = payload.downcast_ref::<String>() {
        format!("tool panicked: {text}")
    } else {
        "tool panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::CallContextBuilder;
    use crate::tool::{ParamKind, ParamSpec};
    use hostmcp_test_utils::{EchoOperation, FailingOperation, FixedOperation, SleepingOperation};
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn echo_tool() -> ToolDefinition {
        ToolDefinition::new("echo", "echo")
            .param(ParamSpec::required("x", ParamKind::Integer))
            .recipe(|args| Ok(CallContextBuilder::new().json_body(args.clone().into_value())))
    }

    #[test]
    fn echoes_json_body() {
        let adapter = ToolAdapter::new(echo_tool(), Arc::new(EchoOperation::new("echo").body_only()));
        assert_eq!(adapter.invoke(json!({"x": 1})), json!({"x": 1}));
    }

    #[test]
    fn missing_argument_becomes_error_object() {
        let adapter = ToolAdapter::new(echo_tool(), Arc::new(EchoOperation::new("echo").body_only()));
        let result = adapter.invoke(json!({}));
        let message = result["error"].as_str().expect("error message");
        assert!(message.contains("missing required argument: x"));
    }

    #[test]
    fn host_failure_becomes_error_object() {
        let adapter = ToolAdapter::new(echo_tool(), Arc::new(FailingOperation::new("echo", "boom")));
        assert_eq!(
            adapter.invoke(json!({"x": 1})),
            json!({"error": "operation failed: boom"})
        );
    }

    #[test]
    fn recipe_panic_is_contained() {
        let definition = ToolDefinition::new("bad", "echo").recipe(|_| panic!("recipe broke"));
        let adapter = ToolAdapter::new(definition, Arc::new(EchoOperation::new("echo")));
        let result = adapter.invoke(json!({}));
        assert!(
            result["error"]
                .as_str()
                .is_some_and(|message| message.contains("recipe broke"))
        );
    }

    #[test]
    fn timeout_reports_error() {
        let definition = ToolDefinition::new("slow", "slow").timeout(Duration::from_millis(50));
        let adapter = ToolAdapter::new(
            definition,
            Arc::new(SleepingOperation::new("slow", Duration::from_secs(2))),
        );
        let result = adapter.invoke(json!({}));
        assert!(
            result["error"]
                .as_str()
                .is_some_and(|message| message.contains("timeout"))
        );
    }

    #[test]
    fn binary_becomes_summary() {
        let definition = ToolDefinition::new("view", "view").shape(ResultShape::Summary);
        let operation = FixedOperation::new("view")
            .with_response(HostResponse::binary(200, "image/png", vec![0; 16]));
        let adapter = ToolAdapter::new(definition, Arc::new(operation));
        assert_eq!(
            adapter.invoke(json!({})),
            json!({"status": "success", "content_type": "image/png", "content_length": 16})
        );
    }

    #[test]
    fn binary_error_status_is_failure() {
        let definition = ToolDefinition::new("view", "view").shape(ResultShape::Summary);
        let operation = FixedOperation::new("view")
            .with_response(HostResponse::binary(404, "text/plain", b"missing".to_vec()));
        let adapter = ToolAdapter::new(definition, Arc::new(operation));
        assert_eq!(
            adapter.invoke(json!({})),
            json!({"error": "execution failed: host returned status 404"})
        );
    }

    #[test]
    fn bytes_are_base64() {
        let definition = ToolDefinition::new("raw", "raw").shape(ResultShape::Bytes);
        let operation = FixedOperation::new("raw")
            .with_response(HostResponse::binary(200, "image/png", b"hi".to_vec()));
        let adapter = ToolAdapter::new(definition, Arc::new(operation));
        assert_eq!(adapter.invoke(json!({})), json!("aGk="));
    }

    #[test]
    fn acknowledge_renders_arguments() {
        let definition = ToolDefinition::new("delete_queue_item", "post_queue")
            .param(ParamSpec::required("prompt_id", ParamKind::String))
            .shape(ResultShape::Acknowledge("Queue item {prompt_id} deleted".to_string()))
            .mutating();
        let operation = FixedOperation::new("post_queue").with_result(json!({}));
        let adapter = ToolAdapter::new(definition, Arc::new(operation));
        assert_eq!(
            adapter.invoke(json!({"prompt_id": "p-1"})),
            json!({"status": "success", "message": "Queue item p-1 deleted"})
        );
    }

    #[test]
    fn keyed_and_stringified_results() {
        let host = Arc::new(FixedOperation::new("op").with_result(json!(["a", "b"])));
        let keyed = ToolAdapter::new(
            ToolDefinition::new("k", "op").shape(ResultShape::Keyed("models".to_string())),
            host.clone(),
        );
        assert_eq!(keyed.invoke(json!({})), json!({"models": ["a", "b"]}));

        let stringified =
            ToolAdapter::new(ToolDefinition::new("s", "op").shape(ResultShape::Stringify), host);
        assert_eq!(stringified.invoke(json!({})), json!(r#"["a","b"]"#));
    }

    #[test]
    fn output_policy_limits_json() {
        let policy = ToolOutputPolicy {
            max_array_len: 1,
            ..ToolOutputPolicy::default()
        };
        let adapter = ToolAdapter::new(
            ToolDefinition::new("list", "op"),
            Arc::new(FixedOperation::new("op").with_result(json!([1, 2, 3]))),
        )
        .with_output_policy(Arc::new(policy));
        assert_eq!(adapter.invoke(json!({})), json!([1]));
    }
}
