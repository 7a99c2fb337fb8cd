//! Synthetic call context handed to host operations in place of a transport request.

use serde_json::Value;
use std::collections::BTreeMap;

/// Named byte stream attached to a multipart body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// Form field name the host reads the stream from (e.g. `image`).
    pub field: String,
    /// Filename reported alongside the stream.
    pub filename: String,
    /// Optional content type hint.
    pub content_type: Option<String>,
    /// Raw bytes, never inspected by this layer.
    pub bytes: Vec<u8>,
}

/// Multipart form payload: plain fields plus attachments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultipartForm {
    pub fields: BTreeMap<String, String>,
    pub attachments: Vec<Attachment>,
}

impl MultipartForm {
    /// Look up an attachment by field name.
    pub fn attachment(&self, field: &str) -> Option<&Attachment> {
        self.attachments.iter().find(|item| item.field == field)
    }
}

/// Body of a call context. Exactly one form is present per call.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Body {
    #[default]
    Empty,
    Json(Value),
    Raw(Vec<u8>),
    Multipart(MultipartForm),
}

impl Body {
    pub fn is_empty(&self) -> bool {
        matches!(self, Body::Empty)
    }

    /// JSON payload, if this body carries one.
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Body::Json(value) => Some(value),
            _ => None,
        }
    }

    /// Short label used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Body::Empty => "empty",
            Body::Json(_) => "json",
            Body::Raw(_) => "raw",
            Body::Multipart(_) => "multipart",
        }
    }
}

/// Host-shaped request stand-in built fresh for every invocation.
///
/// All maps are always present (possibly empty) so operations can read
/// optional keys without special-casing absence. There are no setters; a
/// context is immutable once constructed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallContext {
    query: BTreeMap<String, String>,
    path_params: BTreeMap<String, String>,
    headers: BTreeMap<String, String>,
    body: Body,
}

impl CallContext {
    pub fn new(
        query: BTreeMap<String, String>,
        path_params: BTreeMap<String, String>,
        headers: BTreeMap<String, String>,
        body: Body,
    ) -> Self {
        Self {
            query,
            path_params,
            headers,
            body,
        }
    }

    pub fn query(&self) -> &BTreeMap<String, String> {
        &self.query
    }

    pub fn path_params(&self) -> &BTreeMap<String, String> {
        &self.path_params
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    /// Query value by key, or `None` when the key is absent.
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query.get(key).map(String::as_str)
    }

    /// Path parameter by key, or `None` when the key is absent.
    pub fn path_value(&self, key: &str) -> Option<&str> {
        self.path_params.get(key).map(String::as_str)
    }

    /// Header lookup, case-insensitive on the name.
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Consume the context and return the body.
    pub fn into_body(self) -> Body {
        self.body
    }
}
