use crate::context::CallContextBuilder;
use crate::tool::{ParamKind, ParamSpec, ResultShape, ToolDefinition};
use serde_json::json;

pub(super) fn definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition::new("get_history", "get_history")
            .description("List finished prompts with their outputs")
            .param(
                ParamSpec::optional("max_items", ParamKind::Integer)
                    .describe("Only return the most recent entries"),
            )
            .recipe(|args| {
                Ok(CallContextBuilder::new()
                    .query_opt("max_items", args.int("max_items").map(|n| n.to_string())))
            }),
        ToolDefinition::new("get_history_by_id", "get_history_prompt_id")
            .description("History entry for one prompt")
            .param(ParamSpec::required("prompt_id", ParamKind::String))
            .recipe(|args| {
                Ok(CallContextBuilder::new().path_param("prompt_id", args.str("prompt_id")?))
            }),
        ToolDefinition::new("clear_history", "post_history")
            .description("Delete every history entry")
            .recipe(|_| Ok(CallContextBuilder::new().json_body(json!({"clear": true}))))
            .shape(ResultShape::Acknowledge("History cleared".to_string()))
            .mutating(),
        ToolDefinition::new("delete_history_item", "post_history")
            .description("Delete one history entry")
            .param(ParamSpec::required("prompt_id", ParamKind::String))
            .recipe(|args| {
                let id = args.str("prompt_id")?;
                Ok(CallContextBuilder::new().json_body(json!({"delete": [id]})))
            })
            .shape(ResultShape::Acknowledge(
                "History item {prompt_id} deleted".to_string(),
            ))
            .mutating(),
    ]
}
