use crate::context::CallContextBuilder;
use crate::tool::{ParamKind, ParamSpec, ToolDefinition};

pub(super) fn definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition::new("get_system_stats", "system_stats")
            .description("Host version, devices and memory usage"),
        ToolDefinition::new("get_features", "get_features")
            .description("Feature flags advertised by the host"),
        ToolDefinition::new("get_object_info", "get_object_info")
            .description("Input and output signatures of every node class"),
        ToolDefinition::new("get_object_info_by_node", "get_object_info_node")
            .description("Signature of one node class")
            .param(ParamSpec::required("node_class", ParamKind::String))
            .recipe(|args| {
                Ok(CallContextBuilder::new().path_param("node_class", args.str("node_class")?))
            }),
        ToolDefinition::new("get_queue_status", "get_queue")
            .description("Running and pending queue entries"),
        ToolDefinition::new("get_prompt_status", "get_prompt")
            .description("Remaining queue length"),
    ]
}
