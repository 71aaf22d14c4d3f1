//! Shared test fixtures: a tiny in-process upstream MCP server exposing one
//! `echo` tool, and a helper that drives the aggregator's SSE transport the
//! way a real client would (open session, read `endpoint`, POST, read the
//! matching `message` event).

use std::sync::Arc;

use async_stream::stream;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive};
use axum::response::{IntoResponse, Sse};
use axum::routing::{get, post};
use axum::{Json, Router};
use dashmap::DashMap;
use futures::StreamExt;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use url::Url;
use uuid::Uuid;

#[derive(Clone, Default)]
struct EchoState {
    sessions: Arc<DashMap<String, mpsc::UnboundedSender<Value>>>,
}

/// Start an in-process upstream exposing a single `echo` tool and return its
/// base SSE URL (`http://127.0.0.1:<port>/sse`).
pub async fn spawn_echo_upstream() -> Url {
    let state = EchoState::default();
    let router = Router::new()
        .route("/sse", get(echo_sse))
        .route("/messages", post(echo_post))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    Url::parse(&format!("http://{addr}/sse")).unwrap()
}

async fn echo_sse(
    State(state): State<EchoState>,
) -> Sse<impl futures::Stream<Item = Result<Event, std::convert::Infallible>>> {
    let session_id = Uuid::new_v4().to_string();
    let (tx, mut rx) = mpsc::unbounded_channel();
    state.sessions.insert(session_id.clone(), tx);

    let body = stream! {
        yield Ok(Event::default().event("endpoint").data(format!("/messages?sessionId={session_id}")));
        while let Some(message) = rx.recv().await {
            if let Ok(event) = Event::default().event("message").json_data(message) {
                yield Ok(event);
            }
        }
    };
    Sse::new(body).keep_alive(KeepAlive::default())
}

#[derive(Deserialize)]
struct EchoQuery {
    #[serde(rename = "sessionId")]
    session_id: String,
}

async fn echo_post(
    State(state): State<EchoState>,
    Query(query): Query<EchoQuery>,
    Json(request): Json<Value>,
) -> impl IntoResponse {
    let Some(sender) = state.sessions.get(&query.session_id).map(|e| e.value().clone()) else {
        return StatusCode::BAD_REQUEST;
    };
    let id = request.get("id").cloned().unwrap_or(Value::Null);
    let method = request.get("method").and_then(Value::as_str).unwrap_or_default();

    let response = match method {
        "tools/list" => json!({
            "jsonrpc": "2.0", "id": id,
            "result": { "tools": [{
                "name": "echo",
                "description": "Echoes its input back",
                "inputSchema": { "type": "object", "properties": { "message": { "type": "string" } } },
            }] },
        }),
        "tools/call" => {
            let message = request
                .get("params")
                .and_then(|p| p.get("arguments"))
                .and_then(|a| a.get("message"))
                .cloned()
                .unwrap_or(Value::Null);
            json!({ "jsonrpc": "2.0", "id": id, "result": { "echoed": message } })
        }
        "resources/list" => json!({ "jsonrpc": "2.0", "id": id, "result": { "resources": [] } }),
        "prompts/list" => json!({ "jsonrpc": "2.0", "id": id, "result": { "prompts": [] } }),
        other => json!({
            "jsonrpc": "2.0", "id": id,
            "error": { "code": -32601, "message": format!("unknown method '{other}'") },
        }),
    };
    let _ = sender.send(response);
    StatusCode::ACCEPTED
}

/// A handle to a single open SSE session against a running aggregator,
/// driven the way a real MCP client would: read `endpoint`, then POST and
/// wait for the matching `message` event.
pub struct ClientSession {
    http: reqwest::Client,
    post_url: Url,
    stream: std::pin::Pin<Box<dyn futures::Stream<Item = reqwest::Result<bytes::Bytes>> + Send>>,
    buffer: String,
}

impl ClientSession {
    pub async fn open(sse_url: &Url) -> Self {
        let http = reqwest::Client::new();
        let response = http
            .get(sse_url.clone())
            .header("accept", "text/event-stream")
            .send()
            .await
            .unwrap();
        let mut stream: std::pin::Pin<Box<dyn futures::Stream<Item = reqwest::Result<bytes::Bytes>> + Send>> =
            Box::pin(response.bytes_stream());
        let mut buffer = String::new();
        let post_url = loop {
            let chunk = stream.next().await.unwrap().unwrap();
            buffer.push_str(&String::from_utf8_lossy(&chunk));
            if let Some(pos) = buffer.find("\n\n") {
                let frame: String = buffer.drain(..pos + 2).collect();
                let data = frame
                    .lines()
                    .find_map(|l| l.strip_prefix("data:"))
                    .map(|v| v.trim_start().to_string())
                    .unwrap();
                break sse_url.join(&data).unwrap();
            }
        };
        Self { http, post_url, stream, buffer }
    }

    pub fn post_url(&self) -> Url {
        self.post_url.clone()
    }

    pub async fn call(&mut self, request: Value) -> StatusCode {
        let resp = self.http.post(self.post_url.clone()).json(&request).send().await.unwrap();
        StatusCode::from_u16(resp.status().as_u16()).unwrap()
    }

    pub async fn next_message(&mut self) -> Value {
        loop {
            if let Some(pos) = self.buffer.find("\n\n") {
                let frame: String = self.buffer.drain(..pos + 2).collect();
                if let Some(data) = frame.lines().find_map(|l| l.strip_prefix("data:")) {
                    return serde_json::from_str(data.trim_start()).unwrap();
                }
                continue;
            }
            let chunk = self.stream.next().await.unwrap().unwrap();
            self.buffer.push_str(&String::from_utf8_lossy(&chunk));
        }
    }
}
