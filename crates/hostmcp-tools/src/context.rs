//! Builder for synthetic call contexts.

use hostmcp_protocol::{Attachment, Body, BridgeError, CallContext, MultipartForm};
use serde_json::Value;
use std::collections::BTreeMap;

/// Collects the pieces of a host-shaped request and validates them on
/// [`build`](CallContextBuilder::build).
///
/// Only one body form may be set per call: JSON, raw bytes, or a multipart
/// form (attachments plus form fields).
#[derive(Debug, Clone, Default)]
pub struct CallContextBuilder {
    query: BTreeMap<String, String>,
    path_params: BTreeMap<String, String>,
    headers: BTreeMap<String, String>,
    json: Option<Value>,
    raw: Option<Vec<u8>>,
    form: Option<MultipartForm>,
    invalid: Option<String>,
}

impl CallContextBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    /// Add a query entry only when `value` is present.
    pub fn query_opt(self, key: impl Into<String>, value: Option<impl Into<String>>) -> Self {
        match value {
            Some(value) => self.query(key, value),
            None => self,
        }
    }

    pub fn path_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.path_params.insert(key.into(), value.into());
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn json_body(mut self, value: Value) -> Self {
        self.json = Some(value);
        self
    }

    pub fn raw_body(mut self, bytes: impl Into<Vec<u8>>) -> Self {
        self.raw = Some(bytes.into());
        self
    }

    /// Plain field of a multipart form.
    pub fn form_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.form
            .get_or_insert_with(MultipartForm::default)
            .fields
            .insert(key.into(), value.into());
        self
    }

    /// Named byte stream of a multipart form. The bytes are not inspected.
    pub fn attachment(
        self,
        field: impl Into<String>,
        filename: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        self.typed_attachment(field, filename, None::<String>, bytes)
    }

    pub fn typed_attachment(
        mut self,
        field: impl Into<String>,
        filename: impl Into<String>,
        content_type: Option<impl Into<String>>,
        bytes: Vec<u8>,
    ) -> Self {
        let attachment = Attachment {
            field: field.into(),
            filename: filename.into(),
            content_type: content_type.map(Into::into),
            bytes,
        };
        if self.invalid.is_none() {
            if attachment.field.is_empty() {
                self.invalid = Some("attachment field name is empty".to_string());
            } else if attachment.filename.is_empty() {
                self.invalid = Some(format!("attachment {} has no filename", attachment.field));
            }
        }
        self.form
            .get_or_insert_with(MultipartForm::default)
            .attachments
            .push(attachment);
        self
    }

    pub fn build(self) -> Result<CallContext, BridgeError> {
        if let Some(message) = self.invalid {
            return Err(BridgeError::InvalidContext(message));
        }
        let forms: Vec<&str> = [
            self.json.as_ref().map(|_| "json"),
            self.raw.as_ref().map(|_| "raw"),
            self.form.as_ref().map(|_| "multipart"),
        ]
        .into_iter()
        .flatten()
        .collect();
        if forms.len() > 1 {
            return Err(BridgeError::InvalidContext(format!(
                "conflicting body forms: {}",
                forms.join(" and ")
            )));
        }

        let body = match (self.json, self.raw, self.form) {
            (Some(value), _, _) => Body::Json(value),
            (_, Some(bytes), _) => Body::Raw(bytes),
            (_, _, Some(form)) => Body::Multipart(form),
            _ => Body::Empty,
        };
        Ok(CallContext::new(
            self.query,
            self.path_params,
            self.headers,
            body,
        ))
    }
}
