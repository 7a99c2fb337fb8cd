use async_trait::async_trait;
use hostmcp_protocol::{
    Body, CallContext, HOST_API_VERSION, HostCapabilities, HostError, HostOperation, HostResponse,
};
use log::debug;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, Url};
use std::collections::BTreeMap;
use std::sync::Arc;

/// HTTP route behind one host operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    pub operation: &'static str,
    pub method: &'static str,
    /// Path with `{param}` segments filled from path params.
    pub path: &'static str,
}

const fn route(operation: &'static str, method: &'static str, path: &'static str) -> Route {
    Route {
        operation,
        method,
        path,
    }
}

/// Every operation the built-in catalog calls, with its route.
pub const ROUTES: &[Route] = &[
    route("post_prompt", "POST", "/prompt"),
    route("get_prompt", "GET", "/prompt"),
    route("get_queue", "GET", "/queue"),
    route("post_queue", "POST", "/queue"),
    route("post_interrupt", "POST", "/interrupt"),
    route("post_free", "POST", "/free"),
    route("get_history", "GET", "/history"),
    route("get_history_prompt_id", "GET", "/history/{prompt_id}"),
    route("post_history", "POST", "/history"),
    route("upload_image", "POST", "/upload/image"),
    route("view_image", "GET", "/view"),
    route("list_model_types", "GET", "/models"),
    route("get_models", "GET", "/models/{folder}"),
    route("get_embeddings", "GET", "/embeddings"),
    route("get_extensions", "GET", "/extensions"),
    route("view_metadata", "GET", "/view_metadata/{folder_name}"),
    route("system_stats", "GET", "/system_stats"),
    route("get_features", "GET", "/features"),
    route("get_object_info", "GET", "/object_info"),
    route("get_object_info_node", "GET", "/object_info/{node_class}"),
];

/// Host reached over HTTP. Each operation forwards its call context as a
/// request to the matching route.
#[derive(Debug, Clone)]
pub struct HttpHost {
    base_url: String,
    operations: BTreeMap<String, Arc<dyn HostOperation>>,
}

impl HttpHost {
    pub fn new(base_url: impl Into<String>) -> Result<Self, HostError> {
        Self::with_routes(base_url, ROUTES)
    }

    pub fn with_routes(base_url: impl Into<String>, routes: &[Route]) -> Result<Self, HostError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let base = Url::parse(&base_url)
            .map_err(|err| HostError::Failed(format!("invalid host url {base_url}: {err}")))?;
        if base.cannot_be_a_base() {
            return Err(HostError::Failed(format!(
                "host url {base_url} cannot carry a path"
            )));
        }
        // Every bridge call runs on its own short-lived runtime, so pooled
        // connections cannot be reused across calls.
        let client = Client::builder()
            .pool_max_idle_per_host(0)
            .build()
            .map_err(|err| HostError::Transport(err.to_string()))?;
        let mut operations: BTreeMap<String, Arc<dyn HostOperation>> = BTreeMap::new();
        for route in routes {
            let method = Method::from_bytes(route.method.as_bytes()).map_err(|err| {
                HostError::Failed(format!("bad method for {}: {err}", route.operation))
            })?;
            operations.insert(
                route.operation.to_string(),
                Arc::new(HttpOperation {
                    name: route.operation.to_string(),
                    method,
                    path: route.path,
                    base: base.clone(),
                    client: client.clone(),
                }),
            );
        }
        Ok(Self {
            base_url,
            operations,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl HostCapabilities for HttpHost {
    fn api_version(&self) -> u32 {
        HOST_API_VERSION
    }

    fn operation(&self, name: &str) -> Option<Arc<dyn HostOperation>> {
        self.operations.get(name).cloned()
    }

    fn operation_names(&self) -> Vec<String> {
        self.operations.keys().cloned().collect()
    }
}

struct HttpOperation {
    name: String,
    method: Method,
    path: &'static str,
    base: Url,
    client: Client,
}

impl HttpOperation {
    /// Route URL with each `{param}` segment replaced by its encoded value.
    fn url(&self, context: &CallContext) -> Result<Url, HostError> {
        let mut url = self.base.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|()| {
                HostError::Failed(format!("host url {} cannot carry a path", self.base))
            })?;
            segments.pop_if_empty();
            for segment in self.path.split('/').filter(|segment| !segment.is_empty()) {
                match segment
                    .strip_prefix('{')
                    .and_then(|rest| rest.strip_suffix('}'))
                {
                    Some(key) => {
                        let value = context.path_value(key).ok_or_else(|| {
                            HostError::Failed(format!(
                                "missing path parameter {key} for {}",
                                self.name
                            ))
                        })?;
                        segments.push(value);
                    }
                    None => {
                        segments.push(segment);
                    }
                }
            }
        }
        Ok(url)
    }
}

#[async_trait]
impl HostOperation for HttpOperation {
    fn name(&self) -> &str {
        &self.name
    }

    async fn call(&self, context: CallContext) -> Result<HostResponse, HostError> {
        let url = self.url(&context)?;
        debug!(
            "forwarding host call (operation={}, method={}, url={})",
            self.name, self.method, url
        );
        let mut request = self.client.request(self.method.clone(), url);
        if !context.query().is_empty() {
            request = request.query(context.query());
        }
        for (name, value) in context.headers() {
            request = request.header(name.as_str(), value.as_str());
        }
        request = match context.into_body() {
            Body::Empty => request,
            Body::Json(value) => request.json(&value),
            Body::Raw(bytes) => request.body(bytes),
            Body::Multipart(form) => {
                let mut multipart = Form::new();
                for (key, value) in form.fields {
                    multipart = multipart.text(key, value);
                }
                for attachment in form.attachments {
                    let mut part = Part::bytes(attachment.bytes).file_name(attachment.filename);
                    if let Some(content_type) = &attachment.content_type {
                        part = part
                            .mime_str(content_type)
                            .map_err(|err| HostError::Failed(err.to_string()))?;
                    }
                    multipart = multipart.part(attachment.field, part);
                }
                request.multipart(multipart)
            }
        };

        let response = request
            .send()
            .await
            .map_err(|err| HostError::Transport(err.to_string()))?;
        let status = response.status();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = response
            .bytes()
            .await
            .map_err(|err| HostError::Transport(err.to_string()))?;

        if !status.is_success() {
            return Err(HostError::Status {
                status: status.as_u16(),
                message: String::from_utf8_lossy(&bytes).trim().to_string(),
            });
        }
        if bytes.is_empty() {
            return Ok(HostResponse::Json(serde_json::Value::Null));
        }
        if content_type.contains("json") {
            let value =
                serde_json::from_slice(&bytes).map_err(|err| HostError::Decode(err.to_string()))?;
            return Ok(HostResponse::Json(value));
        }
        Ok(HostResponse::binary(
            status.as_u16(),
            content_type,
            bytes.to_vec(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn operation(path: &'static str) -> HttpOperation {
        HttpOperation {
            name: "op".to_string(),
            method: Method::GET,
            path,
            base: Url::parse("http://127.0.0.1:7396").expect("base url"),
            client: Client::new(),
        }
    }

    fn context(params: &[(&str, &str)]) -> CallContext {
        CallContext::new(
            Default::default(),
            params
                .iter()
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .collect(),
            Default::default(),
            Body::Empty,
        )
    }

    #[test]
    fn path_params_are_substituted_and_encoded() {
        let url = operation("/view_metadata/{folder_name}")
            .url(&context(&[("folder_name", "sd 1.5/loras")]))
            .expect("url");
        assert_eq!(
            url.as_str(),
            "http://127.0.0.1:7396/view_metadata/sd%201.5%2Floras"
        );
    }

    #[test]
    fn base_path_prefix_is_kept() {
        let host = HttpHost::with_routes(
            "http://127.0.0.1:7396/comfy/",
            &[route("get_models", "GET", "/models/{folder}")],
        )
        .expect("host");
        let operation = HttpOperation {
            base: Url::parse(host.base_url()).expect("base url"),
            ..operation("/models/{folder}")
        };
        let url = operation
            .url(&context(&[("folder", "checkpoints")]))
            .expect("url");
        assert_eq!(url.as_str(), "http://127.0.0.1:7396/comfy/models/checkpoints");
    }

    #[test]
    fn non_http_base_is_rejected() {
        assert!(matches!(
            HttpHost::new("mailto:host@example.com"),
            Err(HostError::Failed(_))
        ));
    }

    #[test]
    fn missing_path_param_fails() {
        let err = operation("/history/{prompt_id}")
            .url(&context(&[]))
            .unwrap_err();
        assert_eq!(
            err,
            HostError::Failed("missing path parameter prompt_id for op".to_string())
        );
    }

    #[test]
    fn every_route_is_registered() {
        let host = HttpHost::new("http://127.0.0.1:7396/").expect("host");
        assert_eq!(host.base_url(), "http://127.0.0.1:7396");
        for route in ROUTES {
            assert!(host.supports(route.operation), "{}", route.operation);
        }
    }
}
