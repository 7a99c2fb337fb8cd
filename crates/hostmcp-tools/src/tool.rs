//! Tool definitions: parameter signatures, context recipes and result shapes.

use crate::context::CallContextBuilder;
use hostmcp_protocol::{HOST_API_VERSION, ToolError};
use serde_json::{Map, Value, json};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Scalar type of a tool parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    String,
    Integer,
    Number,
    Boolean,
    /// Any JSON value, passed through untouched.
    Json,
}

impl ParamKind {
    fn schema_type(self) -> Option<&'static str> {
        match self {
            ParamKind::String => Some("string"),
            ParamKind::Integer => Some("integer"),
            ParamKind::Number => Some("number"),
            ParamKind::Boolean => Some("boolean"),
            ParamKind::Json => None,
        }
    }

    /// Coerce `value` into this kind. Strings convert to numbers or booleans
    /// only when the text is unambiguous.
    fn coerce(self, name: &str, value: Value) -> Result<Value, ToolError> {
        let mismatch = |value: &Value| {
            ToolError::InvalidArguments(format!(
                "argument {name} must be {}, got {value}",
                self.schema_type().unwrap_or("json")
            ))
        };
        match (self, value) {
            (ParamKind::Json, value) => Ok(value),
            (ParamKind::String, Value::String(text)) => Ok(Value::String(text)),
            (ParamKind::String, Value::Number(number)) => Ok(Value::String(number.to_string())),
            (ParamKind::Integer, Value::Number(number)) => match number.as_i64() {
                Some(int) => Ok(json!(int)),
                None => match number.as_f64() {
                    Some(float) if float.fract() == 0.0 && float.abs() < i64::MAX as f64 => {
                        Ok(json!(float as i64))
                    }
                    _ => Err(mismatch(&Value::Number(number))),
                },
            },
            (ParamKind::Integer, Value::String(text)) => text
                .trim()
                .parse::<i64>()
                .map(|int| json!(int))
                .map_err(|_| mismatch(&Value::String(text))),
            (ParamKind::Number, Value::Number(number)) => Ok(Value::Number(number)),
            (ParamKind::Number, Value::String(text)) => text
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number)
                .ok_or_else(|| mismatch(&Value::String(text))),
            (ParamKind::Boolean, Value::Bool(flag)) => Ok(Value::Bool(flag)),
            (ParamKind::Boolean, Value::String(text)) => {
                match text.trim().to_ascii_lowercase().as_str() {
                    "true" | "1" => Ok(Value::Bool(true)),
                    "false" | "0" => Ok(Value::Bool(false)),
                    _ => Err(mismatch(&Value::String(text))),
                }
            }
            (_, value) => Err(mismatch(&value)),
        }
    }
}

/// One named parameter in a tool signature.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamSpec {
    pub name: String,
    pub kind: ParamKind,
    pub required: bool,
    pub default: Option<Value>,
    pub description: Option<String>,
}

impl ParamSpec {
    pub fn required(name: impl Into<String>, kind: ParamKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: true,
            default: None,
            description: None,
        }
    }

    pub fn optional(name: impl Into<String>, kind: ParamKind) -> Self {
        Self {
            required: false,
            ..Self::required(name, kind)
        }
    }

    /// Optional parameter that falls back to `default` when omitted.
    pub fn with_default(mut self, default: Value) -> Self {
        self.required = false;
        self.default = Some(default);
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    fn schema(&self) -> Value {
        let mut schema = Map::new();
        if let Some(kind) = self.kind.schema_type() {
            schema.insert("type".to_string(), json!(kind));
        }
        if let Some(description) = &self.description {
            schema.insert("description".to_string(), json!(description));
        }
        if let Some(default) = &self.default {
            schema.insert("default".to_string(), default.clone());
        }
        Value::Object(schema)
    }
}

/// Arguments after coercion against a signature.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolArgs {
    values: Map<String, Value>,
}

impl ToolArgs {
    /// Apply defaults, check required parameters and coerce types. Keys not
    /// in the signature are dropped.
    pub fn coerce(params: &[ParamSpec], args: Value) -> Result<Self, ToolError> {
        let mut raw = match args {
            Value::Null => Map::new(),
            Value::Object(map) => map,
            other => {
                return Err(ToolError::InvalidArguments(format!(
                    "arguments must be a JSON object, got {other}"
                )));
            }
        };
        let mut values = Map::new();
        for param in params {
            match raw.remove(&param.name).filter(|value| !value.is_null()) {
                Some(value) => {
                    values.insert(param.name.clone(), param.kind.coerce(&param.name, value)?);
                }
                None => match &param.default {
                    Some(default) => {
                        values.insert(param.name.clone(), default.clone());
                    }
                    None if param.required => {
                        return Err(ToolError::InvalidArguments(format!(
                            "missing required argument: {}",
                            param.name
                        )));
                    }
                    None => {}
                },
            }
        }
        Ok(Self { values })
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Required string argument.
    pub fn str(&self, name: &str) -> Result<&str, ToolError> {
        self.values
            .get(name)
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::InvalidArguments(format!("missing string argument: {name}")))
    }

    /// String argument, treating an empty string as absent.
    pub fn non_empty_str(&self, name: &str) -> Option<&str> {
        self.values
            .get(name)
            .and_then(Value::as_str)
            .filter(|text| !text.is_empty())
    }

    pub fn int(&self, name: &str) -> Option<i64> {
        self.values.get(name).and_then(Value::as_i64)
    }

    /// Boolean argument, `false` when absent.
    pub fn flag(&self, name: &str) -> bool {
        self.values
            .get(name)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Replace `{name}` placeholders with argument values in one pass over
    /// `template`. Substituted values are not scanned again, and unknown
    /// placeholders are left as written.
    pub fn render(&self, template: &str) -> String {
        let mut rendered = String::with_capacity(template.len());
        let mut rest = template;
        while let Some(start) = rest.find('{') {
            rendered.push_str(&rest[..start]);
            let after = &rest[start + 1..];
            let value = after
                .find('}')
                .and_then(|end| self.values.get(&after[..end]).map(|value| (end, value)));
            match value {
                Some((end, Value::String(value))) => {
                    rendered.push_str(value);
                    rest = &after[end + 1..];
                }
                Some((end, other)) => {
                    rendered.push_str(&other.to_string());
                    rest = &after[end + 1..];
                }
                None => {
                    rendered.push('{');
                    rest = after;
                }
            }
        }
        rendered.push_str(rest);
        rendered
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.values)
    }
}

/// How an operation's response is turned into the tool result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultShape {
    /// JSON passes through the output policy; binary becomes a summary.
    Json,
    /// JSON wrapped under a single key, e.g. `{"models": [...]}`.
    Keyed(String),
    /// `{status, content_type, content_length}` for binary payloads.
    Summary,
    /// Base64 of the binary payload.
    Bytes,
    /// `{status: "success", message}` with `{arg}` placeholders filled in.
    Acknowledge(String),
    /// The JSON rendered as a string.
    Stringify,
}

/// Maps coerced arguments onto a context builder.
pub type ContextRecipe =
    Arc<dyn Fn(&ToolArgs) -> Result<CallContextBuilder, ToolError> + Send + Sync>;

/// Everything needed to expose one host operation as a tool.
#[derive(Clone)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub params: Vec<ParamSpec>,
    /// Host operation the tool calls.
    pub operation: String,
    pub recipe: ContextRecipe,
    pub shape: ResultShape,
    /// Per-tool override of the bridge timeout.
    pub timeout: Option<Duration>,
    /// Whether repeating the call is harmless.
    pub idempotent: bool,
    /// Lowest host capability version the tool works against.
    pub min_api_version: u32,
}

impl fmt::Debug for ToolDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolDefinition")
            .field("name", &self.name)
            .field("operation", &self.operation)
            .field("shape", &self.shape)
            .field("idempotent", &self.idempotent)
            .finish()
    }
}

impl ToolDefinition {
    /// Read-only tool calling `operation` with an empty context.
    pub fn new(name: impl Into<String>, operation: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            params: Vec::new(),
            operation: operation.into(),
            recipe: Arc::new(|_| Ok(CallContextBuilder::new())),
            shape: ResultShape::Json,
            timeout: None,
            idempotent: true,
            min_api_version: HOST_API_VERSION,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn param(mut self, param: ParamSpec) -> Self {
        self.params.push(param);
        self
    }

    pub fn recipe<F>(mut self, recipe: F) -> Self
    where
        F: Fn(&ToolArgs) -> Result<CallContextBuilder, ToolError> + Send + Sync + 'static,
    {
        self.recipe = Arc::new(recipe);
        self
    }

    pub fn shape(mut self, shape: ResultShape) -> Self {
        self.shape = shape;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Mark the tool as changing host state.
    pub fn mutating(mut self) -> Self {
        self.idempotent = false;
        self
    }

    pub fn min_api_version(mut self, version: u32) -> Self {
        self.min_api_version = version;
        self
    }

    /// JSON schema for the tool arguments.
    pub fn args_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .params
            .iter()
            .map(|param| (param.name.clone(), param.schema()))
            .collect();
        let required: Vec<&str> = self
            .params
            .iter()
            .filter(|param| param.required)
            .map(|param| param.name.as_str())
            .collect();
        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    pub fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name.clone(),
            description: self.description.clone(),
            args_schema: self.args_schema(),
        }
    }
}

/// Tool metadata for discovery.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub args_schema: Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn signature() -> Vec<ParamSpec> {
        vec![
            ParamSpec::required("prompt_id", ParamKind::String),
            ParamSpec::optional("max_items", ParamKind::Integer),
            ParamSpec::optional("overwrite", ParamKind::Boolean).with_default(json!(false)),
        ]
    }

    #[test]
    fn coerce_applies_defaults_and_types() {
        let args = ToolArgs::coerce(
            &signature(),
            json!({"prompt_id": 42, "max_items": "5", "extra": true}),
        )
        .expect("args");
        assert_eq!(
            args.into_value(),
            json!({"prompt_id": "42", "max_items": 5, "overwrite": false})
        );
    }

    #[test]
    fn coerce_rejects_missing_required() {
        let err = ToolArgs::coerce(&signature(), json!({})).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid arguments: missing required argument: prompt_id"
        );
    }

    #[test]
    fn coerce_rejects_ambiguous_boolean() {
        let err =
            ToolArgs::coerce(&signature(), json!({"prompt_id": "a", "overwrite": "maybe"}))
                .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[test]
    fn null_arguments_mean_empty() {
        let params = vec![ParamSpec::optional("subfolder", ParamKind::String)];
        let args = ToolArgs::coerce(&params, Value::Null).expect("args");
        assert_eq!(args.non_empty_str("subfolder"), None);
    }

    #[test]
    fn render_fills_placeholders() {
        let args = ToolArgs::coerce(&signature(), json!({"prompt_id": "abc"})).expect("args");
        assert_eq!(args.render("item {prompt_id} deleted"), "item abc deleted");
    }

    #[test]
    fn rendered_values_are_not_substituted_again() {
        let params = vec![
            ParamSpec::required("prompt_id", ParamKind::String),
            ParamSpec::optional("client_id", ParamKind::String),
        ];
        let args = ToolArgs::coerce(
            &params,
            json!({"prompt_id": "{client_id}", "client_id": "c1"}),
        )
        .expect("args");
        assert_eq!(
            args.render("{prompt_id} for {client_id}, {missing} and {{client_id}"),
            "{client_id} for c1, {missing} and {c1"
        );
    }

    #[test]
    fn schema_lists_required_params() {
        let definition = ToolDefinition::new("get_history_by_id", "get_history_prompt_id")
            .param(ParamSpec::required("prompt_id", ParamKind::String).describe("Prompt id"));
        assert_eq!(
            definition.args_schema(),
            json!({
                "type": "object",
                "properties": {"prompt_id": {"type": "string", "description": "Prompt id"}},
                "required": ["prompt_id"],
            })
        );
    }
}
