//! A minimal upstream MCP server exposing a single `echo` tool over SSE.
//!
//! Useful as a target to point `mcgravity` at during manual testing:
//!
//! ```sh
//! cargo run --example echo_server -- --port 4001 &
//! cargo run -- http://localhost:4001/sse
//! ```

use std::convert::Infallible;
use std::sync::Arc;

use async_stream::stream;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive};
use axum::response::{IntoResponse, Sse};
use axum::routing::{get, post};
use axum::{Json, Router};
use clap::Parser;
use dashmap::DashMap;
use futures::Stream;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use uuid::Uuid;

#[derive(Parser)]
struct Args {
    #[arg(long, default_value_t = 4001)]
    port: u16,
}

#[derive(Clone, Default)]
struct EchoState {
    sessions: Arc<DashMap<String, mpsc::UnboundedSender<Value>>>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().init();
    let args = Args::parse();
    let state = EchoState::default();

    let router = Router::new()
        .route("/sse", get(sse_handler))
        .route("/messages", post(post_handler))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", args.port))
        .await
        .expect("bind");
    axum::serve(listener, router).await.expect("serve");
}

async fn sse_handler(
    State(state): State<EchoState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
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
struct PostQuery {
    #[serde(rename = "sessionId")]
    session_id: String,
}

async fn post_handler(
    State(state): State<EchoState>,
    Query(query): Query<PostQuery>,
    Json(request): Json<Value>,
) -> impl IntoResponse {
    let Some(sender) = state.sessions.get(&query.session_id).map(|e| e.value().clone()) else {
        return StatusCode::BAD_REQUEST;
    };

    let id = request.get("id").cloned().unwrap_or(Value::Null);
    let method = request.get("method").and_then(Value::as_str).unwrap_or_default();

    let response = match method {
        "tools/list" => json!({
            "jsonrpc": "2.0",
            "id": id,
            "result": {
                "tools": [{
                    "name": "echo",
                    "description": "Echoes its input back",
                    "inputSchema": {
                        "type": "object",
                        "properties": { "message": { "type": "string" } },
                    },
                }],
            },
        }),
        "tools/call" => {
            let message = request
                .get("params")
                .and_then(|p| p.get("arguments"))
                .and_then(|a| a.get("message"))
                .cloned()
                .unwrap_or(Value::Null);
            json!({
                "jsonrpc": "2.0",
                "id": id,
                "result": { "content": [{ "type": "text", "text": message }] },
            })
        }
        "resources/list" => json!({ "jsonrpc": "2.0", "id": id, "result": { "resources": [] } }),
        "prompts/list" => json!({ "jsonrpc": "2.0", "id": id, "result": { "prompts": [] } }),
        other => json!({
            "jsonrpc": "2.0",
            "id": id,
            "error": { "code": -32601, "message": format!("unknown method '{other}'") },
        }),
    };

    let _ = sender.send(response);
    StatusCode::ACCEPTED
}
