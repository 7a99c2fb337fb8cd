//! Prompt submission and queue control.

use crate::context::CallContextBuilder;
use crate::tool::{ParamKind, ParamSpec, ResultShape, ToolDefinition};
use hostmcp_protocol::ToolError;
use serde_json::{Map, Value, json};

pub(super) fn definitions() -> Vec<ToolDefinition> {
    vec![
        submit_workflow(),
        ToolDefinition::new("get_queue_info", "get_queue")
            .description("Show the running and pending queue entries"),
        ToolDefinition::new("clear_queue", "post_queue")
            .description("Remove every pending queue entry")
            .recipe(|_| Ok(CallContextBuilder::new().json_body(json!({"clear": true}))))
            .shape(ResultShape::Acknowledge("Queue cleared".to_string()))
            .mutating(),
        ToolDefinition::new("delete_queue_item", "post_queue")
            .description("Remove one pending queue entry")
            .param(ParamSpec::required("prompt_id", ParamKind::String).describe("Queue entry id"))
            .recipe(|args| {
                let id = args.str("prompt_id")?;
                Ok(CallContextBuilder::new().json_body(json!({"delete": [id]})))
            })
            .shape(ResultShape::Acknowledge(
                "Queue item {prompt_id} deleted".to_string(),
            ))
            .mutating(),
        ToolDefinition::new("interrupt_processing", "post_interrupt")
            .description("Interrupt the prompt currently executing")
            .recipe(|_| Ok(CallContextBuilder::new().json_body(json!({}))))
            .shape(ResultShape::Acknowledge("Processing interrupted".to_string()))
            .mutating(),
        ToolDefinition::new("free_memory", "post_free")
            .description("Unload models and/or free cached memory")
            .param(
                ParamSpec::optional("unload_models", ParamKind::Boolean).with_default(json!(false)),
            )
            .param(
                ParamSpec::optional("free_memory", ParamKind::Boolean).with_default(json!(false)),
            )
            .recipe(|args| {
                Ok(CallContextBuilder::new().json_body(json!({
                    "unload_models": args.flag("unload_models"),
                    "free_memory": args.flag("free_memory"),
                })))
            })
            .shape(ResultShape::Acknowledge("Memory release requested".to_string()))
            .mutating(),
    ]
}

fn submit_workflow() -> ToolDefinition {
    ToolDefinition::new("submit_workflow", "post_prompt")
        .description("Queue a workflow (API format JSON) for execution")
        .param(
            ParamSpec::required("workflow_json", ParamKind::String)
                .describe("Workflow graph serialized as JSON"),
        )
        .param(ParamSpec::optional("client_id", ParamKind::String))
        .param(ParamSpec::optional("prompt_id", ParamKind::String))
        .recipe(|args| {
            let prompt: Value = serde_json::from_str(args.str("workflow_json")?).map_err(|err| {
                ToolError::InvalidArguments(format!("invalid workflow JSON: {err}"))
            })?;
            let mut body = Map::new();
            body.insert("prompt".to_string(), prompt);
            for key in ["client_id", "prompt_id"] {
                if let Some(value) = args.non_empty_str(key) {
                    body.insert(key.to_string(), json!(value));
                }
            }
            Ok(CallContextBuilder::new().json_body(Value::Object(body)))
        })
        .mutating()
}
