use hostmcp_config::ToolsConfig;
use hostmcp_protocol::{Body, CallContext};
use hostmcp_runtime::Bridge;
use hostmcp_test_utils::{FailingOperation, FakeHost, RecordingOperation};
use hostmcp_tools::host::ROUTES;
use hostmcp_tools::{ToolRegistry, builtin_tool_registry};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

struct Recorded {
    registry: ToolRegistry,
    operations: BTreeMap<&'static str, RecordingOperation>,
}

impl Recorded {
    fn new() -> Self {
        let mut host = FakeHost::new();
        let mut operations = BTreeMap::new();
        for route in ROUTES {
            let operation = RecordingOperation::new(route.operation);
            host = host.with_named(route.operation, Arc::new(operation.clone()));
            operations.insert(route.operation, operation);
        }
        let (registry, report) =
            builtin_tool_registry(&host, &ToolsConfig::default(), Bridge::default());
        assert!(report.skipped.is_empty(), "{:?}", report.skipped);
        Self {
            registry,
            operations,
        }
    }

    fn last_call(&self, operation: &str) -> CallContext {
        self.operations[operation]
            .last_call()
            .expect("operation was called")
    }
}

fn sample_args(tool: &str, image_path: &str) -> Value {
    match tool {
        "submit_workflow" => json!({"workflow_json": "{\"1\": {\"class_type\": \"KSampler\"}}"}),
        "delete_queue_item" | "delete_history_item" | "get_history_by_id" => {
            json!({"prompt_id": "p-1"})
        }
        "upload_image" => json!({"image_path": image_path}),
        "view_image" => json!({"filename": "out.png"}),
        "list_models_by_folder" => json!({"folder": "checkpoints"}),
        "view_metadata" => json!({"folder_name": "loras", "filename": "a.safetensors"}),
        "get_object_info_by_node" => json!({"node_class": "KSampler"}),
        _ => json!({}),
    }
}

#[test]
fn full_host_registers_whole_catalog() {
    let recorded = Recorded::new();
    assert_eq!(recorded.registry.len(), 23);
}

#[test]
fn failing_host_yields_error_object_from_every_tool() {
    let image = tempfile::NamedTempFile::new().expect("temp image");
    std::fs::write(image.path(), b"png").expect("write image");
    let image_path = image.path().to_string_lossy().to_string();

    let mut host = FakeHost::new();
    for route in ROUTES {
        host = host.with_named(
            route.operation,
            Arc::new(FailingOperation::new(route.operation, "host unavailable")),
        );
    }
    let (registry, _) = builtin_tool_registry(
        &host,
        &ToolsConfig::default(),
        Bridge::new(Duration::from_secs(5)),
    );

    for name in registry.list() {
        let result = registry.invoke(&name, sample_args(&name, &image_path));
        let object = result.as_object().expect("object result");
        assert_eq!(object.len(), 1, "{name}: {result}");
        let message = object["error"].as_str().expect("error string");
        assert!(message.contains("host unavailable"), "{name}: {message}");
    }
}

#[test]
fn submit_workflow_sends_prompt_body() {
    let recorded = Recorded::new();
    let result = recorded.registry.invoke(
        "submit_workflow",
        json!({"workflow_json": "{\"3\": {\"inputs\": {}}}", "client_id": "c-1", "prompt_id": ""}),
    );
    assert_eq!(result, json!({}));
    let context = recorded.last_call("post_prompt");
    assert_eq!(
        context.body(),
        &Body::Json(json!({"prompt": {"3": {"inputs": {}}}, "client_id": "c-1"}))
    );
}

#[test]
fn invalid_workflow_json_never_reaches_host() {
    let recorded = Recorded::new();
    let result = recorded
        .registry
        .invoke("submit_workflow", json!({"workflow_json": "{not json"}));
    let message = result["error"].as_str().expect("error");
    assert!(message.contains("invalid workflow JSON"), "{message}");
    assert!(recorded.operations["post_prompt"].calls().is_empty());
}

#[test]
fn upload_image_builds_multipart_form() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("cat.png");
    std::fs::write(&path, [0x89, b'P', b'N', b'G']).expect("write");

    let recorded = Recorded::new();
    let result = recorded.registry.invoke(
        "upload_image",
        json!({"image_path": path.to_string_lossy(), "overwrite": "true"}),
    );
    assert_eq!(result, json!({}));

    let context = recorded.last_call("upload_image");
    let Body::Multipart(form) = context.body() else {
        panic!("expected multipart body");
    };
    let image = form.attachment("image").expect("image attachment");
    assert_eq!(image.filename, "cat.png");
    assert_eq!(image.bytes, vec![0x89, b'P', b'N', b'G']);
    let fields: Vec<(&str, &str)> = form
        .fields
        .iter()
        .map(|(key, value)| (key.as_str(), value.as_str()))
        .collect();
    assert_eq!(
        fields,
        vec![("overwrite", "true"), ("subfolder", ""), ("type", "input")]
    );
}

#[test]
fn upload_of_missing_file_is_rejected() {
    let recorded = Recorded::new();
    let result = recorded
        .registry
        .invoke("upload_image", json!({"image_path": "/definitely/not/here.png"}));
    let message = result["error"].as_str().expect("error");
    assert!(message.contains("file not found"), "{message}");
    assert!(recorded.operations["upload_image"].calls().is_empty());
}

#[test]
fn view_image_passes_query_defaults() {
    let recorded = Recorded::new();
    recorded
        .registry
        .invoke("view_image", json!({"filename": "ComfyUI_0001.png"}));
    let context = recorded.last_call("view_image");
    let query: Vec<(&str, &str)> = context
        .query()
        .iter()
        .map(|(key, value)| (key.as_str(), value.as_str()))
        .collect();
    assert_eq!(
        query,
        vec![
            ("channel", "rgba"),
            ("filename", "ComfyUI_0001.png"),
            ("type", "output"),
        ]
    );
}

#[test]
fn history_tools_map_arguments() {
    let recorded = Recorded::new();
    recorded
        .registry
        .invoke("get_history", json!({"max_items": "5"}));
    assert_eq!(recorded.last_call("get_history").query_value("max_items"), Some("5"));

    recorded
        .registry
        .invoke("get_history_by_id", json!({"prompt_id": "abc"}));
    assert_eq!(
        recorded
            .last_call("get_history_prompt_id")
            .path_value("prompt_id"),
        Some("abc")
    );

    let result = recorded
        .registry
        .invoke("delete_history_item", json!({"prompt_id": "abc"}));
    assert_eq!(
        result,
        json!({"status": "success", "message": "History item abc deleted"})
    );
    assert_eq!(
        recorded.last_call("post_history").body(),
        &Body::Json(json!({"delete": ["abc"]}))
    );
}

#[test]
fn queue_control_acknowledges() {
    let recorded = Recorded::new();
    assert_eq!(
        recorded.registry.invoke("clear_queue", json!({})),
        json!({"status": "success", "message": "Queue cleared"})
    );
    assert_eq!(
        recorded.last_call("post_queue").body(),
        &Body::Json(json!({"clear": true}))
    );

    recorded
        .registry
        .invoke("free_memory", json!({"unload_models": true}));
    assert_eq!(
        recorded.last_call("post_free").body(),
        &Body::Json(json!({"unload_models": true, "free_memory": false}))
    );
}

#[test]
fn disabled_tools_are_not_registered() {
    let host = FakeHost::new().with_named(
        "system_stats",
        Arc::new(RecordingOperation::new("system_stats")),
    );
    let config = ToolsConfig {
        disabled: vec!["get_system_stats".to_string()],
        ..ToolsConfig::default()
    };
    let (registry, report) = builtin_tool_registry(&host, &config, Bridge::default());
    assert!(registry.is_empty());
    assert!(report.registered.is_empty());
    assert_eq!(report.skipped.len(), 22);
}
