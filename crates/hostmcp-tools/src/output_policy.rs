//! Size limits and key redaction for JSON tool results.

use hostmcp_config::ToolOutputPolicyConfig;
use serde_json::{Map, Value};

/// Bounds applied to every JSON result before it leaves the adapter.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutputPolicy {
    pub max_string_bytes: usize,
    pub max_array_len: usize,
    pub max_object_entries: usize,
    /// Keys (case-insensitive) whose values are replaced wholesale.
    pub redact_keys: Vec<String>,
    pub replacement: String,
}

impl Default for ToolOutputPolicy {
    fn default() -> Self {
        ToolOutputPolicyConfig::default().into()
    }
}

impl From<ToolOutputPolicyConfig> for ToolOutputPolicy {
    fn from(config: ToolOutputPolicyConfig) -> Self {
        Self {
            max_string_bytes: config.max_string_bytes,
            max_array_len: config.max_array_len,
            max_object_entries: config.max_object_entries,
            redact_keys: config.redact_keys,
            replacement: config.replacement,
        }
    }
}

impl ToolOutputPolicy {
    pub fn apply(&self, value: Value) -> Value {
        match value {
            Value::String(text) => Value::String(self.clip(text)),
            Value::Array(items) => Value::Array(
                items
                    .into_iter()
                    .take(self.max_array_len)
                    .map(|item| self.apply(item))
                    .collect(),
            ),
            Value::Object(entries) => {
                let mut kept = Map::new();
                for (key, value) in entries.into_iter().take(self.max_object_entries) {
                    let value = if self.is_redacted(&key) {
                        Value::String(self.clip(self.replacement.clone()))
                    } else {
                        self.apply(value)
                    };
                    kept.insert(key, value);
                }
                Value::Object(kept)
            }
            scalar => scalar,
        }
    }

    fn is_redacted(&self, key: &str) -> bool {
        self.redact_keys
            .iter()
            .any(|candidate| candidate.eq_ignore_ascii_case(key))
    }

    /// Cut to at most `max_string_bytes`, backing off to a char boundary.
    fn clip(&self, mut text: String) -> String {
        if text.len() <= self.max_string_bytes {
            return text;
        }
        let mut end = self.max_string_bytes;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        text.truncate(end);
        text
    }
}
