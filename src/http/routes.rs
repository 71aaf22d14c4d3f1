//! Route wiring for the federated MCP frontend.
//!
//! `/` and `/sse` are accepted identically for the SSE GET, and `/messages`
//! and `/sessions` identically for the JSON-RPC POST: both forms appear
//! across real MCP clients and there's no reason to pick one.

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::sse::Event;
use axum::response::{IntoResponse, Sse};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::Stream;
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;

use crate::protocol::JsonRpcRequest;
use crate::transport::session::{SessionId, SseSession};
use crate::transport::sse::into_sse_response;

use super::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(sse_handler))
        .route("/sse", get(sse_handler))
        .route("/messages", post(post_handler))
        .route("/sessions", post(post_handler))
        .route("/health", get(health_handler))
        .route("/api/list-targets", get(list_targets_handler))
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn sse_handler(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (session, receiver) = SseSession::new();
    state.sessions.insert(session.id().clone(), session.clone());
    into_sse_response(session, receiver, "/messages".to_string())
}

#[derive(Debug, Deserialize)]
struct PostQuery {
    #[serde(rename = "sessionId")]
    session_id: Option<String>,
}

async fn post_handler(
    State(state): State<AppState>,
    Query(query): Query<PostQuery>,
    headers: axum::http::HeaderMap,
    body: axum::body::Bytes,
) -> impl IntoResponse {
    let Some(session_id) = query.session_id else {
        return (StatusCode::BAD_REQUEST, "missing sessionId query parameter").into_response();
    };
    let Some(session) = state
        .sessions
        .get(&SessionId::from(session_id))
        .map(|e| e.value().clone())
    else {
        return (StatusCode::BAD_REQUEST, "Invalid session ID").into_response();
    };

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if !content_type.starts_with("application/json") {
        let error = json!({
            "jsonrpc": "2.0",
            "id": Value::Null,
            "error": { "code": -32600, "message": "content-type must be application/json" },
        });
        let _ = session.send(error);
        return (StatusCode::BAD_REQUEST, "content-type must be application/json").into_response();
    }

    let request: JsonRpcRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            let error = json!({
                "jsonrpc": "2.0",
                "id": Value::Null,
                "error": { "code": -32700, "message": format!("parse error: {e}") },
            });
            let _ = session.send(error);
            return (StatusCode::BAD_REQUEST, "malformed JSON-RPC request").into_response();
        }
    };

    let is_notification = request.is_notification();
    let server = state.server.clone();
    let composer = state.composer.clone();
    let registry = state.registry.clone();
    tokio::spawn(async move {
        if is_notification {
            return;
        }
        let (response, lost_upstream) = server.dispatch(request).await;
        if let Some(upstream_key) = lost_upstream {
            if let Some(descriptor) = registry.get(&upstream_key) {
                composer.handle_upstream_loss(descriptor);
            }
        }
        let _ = session.send(serde_json::to_value(response).unwrap_or(Value::Null));
    });

    StatusCode::ACCEPTED.into_response()
}

async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

async fn list_targets_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.registry.list())
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "not found")
}

/// Bound on how long binding the frontend listener may take at startup.
/// SSE connections themselves are kept alive explicitly via `KeepAlive` and
/// are not subject to this timeout.
pub const BIND_TIMEOUT: Duration = Duration::from_secs(30);
