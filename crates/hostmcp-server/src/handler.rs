//! JSON-RPC dispatch for the MCP methods the server answers.

use hostmcp_protocol::rpc::{
    CallToolRequestParams, CallToolResult, Content, INTERNAL_ERROR, INVALID_PARAMS, Implementation,
    InitializeResult, JsonObject, JsonRpcRequest, JsonRpcResponse, ListToolsResult,
    METHOD_NOT_FOUND, PROTOCOL_VERSION, ProtocolVersion, ServerCapabilities, Tool,
};
use hostmcp_tools::ToolRegistry;
use log::{debug, warn};
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;

/// Answers MCP requests against a tool registry.
#[derive(Debug, Clone)]
pub struct McpHandler {
    registry: ToolRegistry,
    info: Implementation,
}

impl McpHandler {
    pub fn new(registry: ToolRegistry, name: impl Into<String>) -> Self {
        Self {
            registry,
            info: Implementation {
                name: name.into(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                ..Implementation::default()
            },
        }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Handle one message. Notifications produce no response.
    pub async fn handle(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        debug!("mcp request (method={})", request.method);
        if request.is_notification() {
            return None;
        }
        let id = request.id.clone();
        let response = match request.method.as_str() {
            "initialize" => self.initialize(request.params.as_ref()),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(self.list_tools()),
            "tools/call" => self.call_tool(request.params).await,
            other => Err((METHOD_NOT_FOUND, format!("method not found: {other}"))),
        };
        Some(match response {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err((code, message)) => JsonRpcResponse::failure(id, code, message),
        })
    }

    fn initialize(&self, params: Option<&Value>) -> Result<Value, (i32, String)> {
        let protocol_version = params
            .and_then(|params| params.get("protocolVersion"))
            .and_then(|version| ProtocolVersion::deserialize(version).ok())
            .unwrap_or(PROTOCOL_VERSION);
        let result = InitializeResult {
            protocol_version,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: self.info.clone(),
            instructions: None,
        };
        serde_json::to_value(result).map_err(|err| (INTERNAL_ERROR, err.to_string()))
    }

    fn list_tools(&self) -> Value {
        let tools = self
            .registry
            .specs()
            .into_iter()
            .map(|spec| {
                let schema = match spec.args_schema {
                    Value::Object(schema) => schema,
                    _ => JsonObject::new(),
                };
                let mut tool = Tool::new(spec.name, spec.description, Arc::new(schema));
                tool.description = tool.description.filter(|text| !text.is_empty());
                tool
            })
            .collect();
        serde_json::to_value(ListToolsResult::with_all_items(tools))
            .unwrap_or_else(|_| json!({"tools": []}))
    }

    async fn call_tool(&self, params: Option<Value>) -> Result<Value, (i32, String)> {
        let params: CallToolRequestParams = serde_json::from_value(params.unwrap_or(Value::Null))
            .map_err(|err| (INVALID_PARAMS, format!("invalid tools/call params: {err}")))?;
        let Some(adapter) = self.registry.get(&params.name) else {
            return Err((INVALID_PARAMS, format!("tool not found: {}", params.name)));
        };
        let args = params.arguments.map(Value::Object).unwrap_or(Value::Null);
        // Adapters block on the bridge; keep them off the async workers.
        let output = tokio::task::spawn_blocking(move || adapter.invoke(args))
            .await
            .map_err(|err| (INTERNAL_ERROR, format!("tool task failed: {err}")))?;

        let is_error = output
            .as_object()
            .is_some_and(|object| object.len() == 1 && object.contains_key("error"));
        if is_error {
            warn!("tool returned error (name={})", params.name);
        }
        let text = match output {
            Value::String(text) => text,
            other => other.to_string(),
        };
        let content = vec![Content::text(text)];
        let result = if is_error {
            CallToolResult::error(content)
        } else {
            CallToolResult::success(content)
        };
        serde_json::to_value(result).map_err(|err| (INTERNAL_ERROR, err.to_string()))
    }
}
