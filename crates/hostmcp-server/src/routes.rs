//! HTTP surface: streamable HTTP on `/mcp`, legacy SSE on `/sse` plus
//! `/messages`, and `/health`.

use crate::handler::McpHandler;
use crate::session::{SessionStore, SseGuard};
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode, header};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use hostmcp_protocol::SESSION_ID_HEADER;
use hostmcp_protocol::rpc::{INVALID_REQUEST, JsonRpcRequest, JsonRpcResponse, PARSE_ERROR};
use log::{info, warn};
use serde::Deserialize;
use serde_json::{Value, json};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio_stream::{Stream, StreamExt};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tower_http::cors::CorsLayer;

#[derive(Clone)]
struct AppState {
    handler: McpHandler,
    sessions: Arc<SessionStore>,
}

pub(crate) fn router(handler: McpHandler, cors: CorsLayer, session_idle: Duration) -> Router {
    let state = AppState {
        handler,
        sessions: Arc::new(SessionStore::new(session_idle)),
    };
    Router::new()
        .route("/mcp", post(post_mcp).get(get_mcp).delete(delete_mcp))
        .route("/sse", get(open_sse))
        .route("/messages", post(post_message))
        .route("/health", get(health))
        .with_state(state)
        .layer(cors)
}

fn session_header() -> HeaderName {
    HeaderName::from_static("mcp-session-id")
}

fn session_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get(SESSION_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

fn rpc_error(status: StatusCode, code: i32, message: impl Into<String>) -> Response {
    (status, Json(JsonRpcResponse::failure(None, code, message))).into_response()
}

fn is_initialize(message: &Value) -> bool {
    message.get("method").and_then(Value::as_str) == Some("initialize")
}

async fn post_mcp(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let message: Value = match serde_json::from_slice(&body) {
        Ok(message) => message,
        Err(err) => {
            return rpc_error(StatusCode::BAD_REQUEST, PARSE_ERROR, format!("parse error: {err}"));
        }
    };
    let (messages, batch) = match message {
        Value::Array(items) => (items, true),
        other => (vec![other], false),
    };
    if messages.is_empty() {
        return rpc_error(StatusCode::BAD_REQUEST, INVALID_REQUEST, "empty batch");
    }

    let initializing = messages.iter().any(is_initialize);
    let session = session_id(&headers);
    if !initializing {
        if let Some(id) = &session {
            if !state.sessions.has_http(id) {
                return rpc_error(StatusCode::NOT_FOUND, INVALID_REQUEST, "unknown session");
            }
        }
    }

    let mut responses = Vec::new();
    for message in messages {
        match serde_json::from_value::<JsonRpcRequest>(message) {
            Ok(request) => {
                if let Some(response) = state.handler.handle(request).await {
                    responses.push(response);
                }
            }
            Err(err) => responses.push(JsonRpcResponse::failure(
                None,
                INVALID_REQUEST,
                format!("invalid request: {err}"),
            )),
        }
    }

    let session = if initializing {
        Some(state.sessions.open_http())
    } else {
        session
    };
    let mut response = match (responses.len(), batch) {
        (0, _) => StatusCode::ACCEPTED.into_response(),
        (_, true) => Json(responses).into_response(),
        (_, false) => Json(responses.remove(0)).into_response(),
    };
    if let Some(value) = session.and_then(|id| HeaderValue::from_str(&id).ok()) {
        response.headers_mut().insert(session_header(), value);
    }
    response
}

/// No server-initiated stream is offered on `/mcp`.
async fn get_mcp() -> Response {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        [(header::ALLOW, "POST, DELETE")],
    )
        .into_response()
}

async fn delete_mcp(State(state): State<AppState>, headers: HeaderMap) -> StatusCode {
    match session_id(&headers) {
        Some(id) if state.sessions.close_http(&id) => StatusCode::NO_CONTENT,
        Some(_) => StatusCode::NOT_FOUND,
        None => StatusCode::BAD_REQUEST,
    }
}

async fn open_sse(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (id, receiver) = state.sessions.open_sse();
    info!("sse client connected (session={})", id);
    let endpoint = Event::default()
        .event("endpoint")
        .data(format!("/messages?session_id={id}"));
    let guard = SseGuard {
        sessions: state.sessions.clone(),
        id,
    };
    let messages = UnboundedReceiverStream::new(receiver).map(move |message| {
        let _ = &guard;
        Ok(Event::default().event("message").data(message))
    });
    let stream = tokio_stream::once(Ok(endpoint)).chain(messages);
    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}

#[derive(Debug, Deserialize)]
struct MessageQuery {
    session_id: String,
}

async fn post_message(
    State(state): State<AppState>,
    Query(query): Query<MessageQuery>,
    body: Bytes,
) -> Response {
    let Some(sender) = state.sessions.sse_sender(&query.session_id) else {
        return rpc_error(StatusCode::NOT_FOUND, INVALID_REQUEST, "unknown session");
    };
    let request: JsonRpcRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(err) => {
            return rpc_error(StatusCode::BAD_REQUEST, PARSE_ERROR, format!("parse error: {err}"));
        }
    };
    if let Some(response) = state.handler.handle(request).await {
        let text = match serde_json::to_string(&response) {
            Ok(text) => text,
            Err(err) => {
                warn!("failed to encode response (error={})", err);
                return StatusCode::INTERNAL_SERVER_ERROR.into_response();
            }
        };
        if sender.send(text).is_err() {
            state.sessions.close_sse(&query.session_id);
            return StatusCode::GONE.into_response();
        }
    }
    StatusCode::ACCEPTED.into_response()
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "tools": state.handler.registry().len(),
    }))
}
