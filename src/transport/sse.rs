//! Axum SSE wiring: turns an [`SseSession`] into the byte stream a GET
//! handler returns. The first event is always `endpoint`, carrying the URL
//! the client must POST JSON-RPC requests to.

use std::convert::Infallible;
use std::sync::Arc;

use async_stream::stream;
use axum::response::sse::{Event, KeepAlive};
use axum::response::Sse;
use futures::Stream;
use tokio::sync::mpsc;

use super::session::{SessionId, SseSession};

/// Build the mandatory first event: tells the client where to POST.
pub fn endpoint_event(session_id: &SessionId, post_path: &str) -> Event {
    let data = format!("{post_path}?sessionId={session_id}");
    Event::default().event("endpoint").data(data)
}

/// Wrap a session's outbound channel into the SSE byte stream axum serves.
/// Sends the `endpoint` event first, marks the session `Open`, then relays
/// every subsequent queued message as a `message` event until the channel
/// closes (client disconnect) or the session is closed from elsewhere.
pub fn into_sse_response(
    session: Arc<SseSession>,
    mut receiver: mpsc::UnboundedReceiver<serde_json::Value>,
    post_path: String,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let body = stream! {
        yield Ok(endpoint_event(session.id(), &post_path));
        session.mark_open();

        while let Some(message) = receiver.recv().await {
            let event = Event::default().event("message").json_data(message);
            match event {
                Ok(event) => yield Ok(event),
                Err(_) => continue,
            }
        }

        session.close();
    };

    Sse::new(body).keep_alive(KeepAlive::default())
}
