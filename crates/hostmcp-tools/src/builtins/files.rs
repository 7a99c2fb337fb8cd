//! Uploads, image previews and model listings.

use crate::context::CallContextBuilder;
use crate::tool::{ParamKind, ParamSpec, ResultShape, ToolArgs, ToolDefinition};
use hostmcp_protocol::ToolError;
use serde_json::json;
use std::path::Path;

pub(super) fn definitions() -> Vec<ToolDefinition> {
    vec![
        upload_image(),
        view_image(),
        ToolDefinition::new("list_models", "list_model_types")
            .description("List model folder types")
            .shape(ResultShape::Keyed("models".to_string())),
        ToolDefinition::new("list_models_by_folder", "get_models")
            .description("List model files in one folder")
            .param(
                ParamSpec::required("folder", ParamKind::String)
                    .describe("Model folder, e.g. checkpoints"),
            )
            .recipe(|args| Ok(CallContextBuilder::new().path_param("folder", args.str("folder")?)))
            .shape(ResultShape::Keyed("models".to_string())),
        ToolDefinition::new("list_embeddings", "get_embeddings")
            .description("List embedding names")
            .shape(ResultShape::Keyed("embeddings".to_string())),
        ToolDefinition::new("list_extensions", "get_extensions")
            .description("List frontend extension scripts")
            .shape(ResultShape::Keyed("extensions".to_string())),
        ToolDefinition::new("view_metadata", "view_metadata")
            .description("Read safetensors metadata of a model file")
            .param(ParamSpec::required("folder_name", ParamKind::String))
            .param(ParamSpec::required("filename", ParamKind::String))
            .recipe(|args| {
                Ok(CallContextBuilder::new()
                    .path_param("folder_name", args.str("folder_name")?)
                    .query("filename", args.str("filename")?))
            })
            .shape(ResultShape::Keyed("metadata".to_string())),
    ]
}

fn upload_image() -> ToolDefinition {
    ToolDefinition::new("upload_image", "upload_image")
        .description("Upload a local image file to the host")
        .param(
            ParamSpec::required("image_path", ParamKind::String)
                .describe("Path of the image on this machine"),
        )
        .param(ParamSpec::optional("subfolder", ParamKind::String).with_default(json!("")))
        .param(
            ParamSpec::optional("upload_type", ParamKind::String)
                .with_default(json!("input"))
                .describe("input, output or temp"),
        )
        .param(ParamSpec::optional("overwrite", ParamKind::Boolean).with_default(json!(false)))
        .recipe(upload_recipe)
        .mutating()
}

fn upload_recipe(args: &ToolArgs) -> Result<CallContextBuilder, ToolError> {
    let image_path = args.str("image_path")?;
    let path = Path::new(image_path);
    if !path.is_file() {
        return Err(ToolError::InvalidArguments(format!(
            "file not found: {image_path}"
        )));
    }
    let bytes = std::fs::read(path)
        .map_err(|err| ToolError::InvalidArguments(format!("cannot read {image_path}: {err}")))?;
    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| image_path.to_string());
    Ok(CallContextBuilder::new()
        .attachment("image", filename, bytes)
        .form_field("subfolder", args.str("subfolder")?)
        .form_field("type", args.str("upload_type")?)
        .form_field("overwrite", args.flag("overwrite").to_string()))
}

fn view_image() -> ToolDefinition {
    ToolDefinition::new("view_image", "view_image")
        .description("Fetch an image and report its type and size")
        .param(ParamSpec::required("filename", ParamKind::String))
        .param(ParamSpec::optional("image_type", ParamKind::String).with_default(json!("output")))
        .param(ParamSpec::optional("subfolder", ParamKind::String).with_default(json!("")))
        .param(ParamSpec::optional("channel", ParamKind::String).with_default(json!("rgba")))
        .param(ParamSpec::optional("preview", ParamKind::String))
        .recipe(|args| {
            Ok(CallContextBuilder::new()
                .query("filename", args.str("filename")?)
                .query("type", args.str("image_type")?)
                .query("channel", args.str("channel")?)
                .query_opt("subfolder", args.non_empty_str("subfolder"))
                .query_opt("preview", args.non_empty_str("preview")))
        })
        .shape(ResultShape::Summary)
}
