//! A single SSE session's state machine and outbound message channel.
//!
//! A session moves `Opening -> Open -> Closed` and `close()` is idempotent:
//! it reports whether this call performed the transition, so a caller can
//! use it to guard a one-shot side effect regardless of whether the session
//! was closed by the client disconnecting or by the server.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::error::{AggregatorError, AggregatorResult};

/// Opaque session identifier, handed to the client in the `endpoint` event
/// and expected back on every subsequent POST.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for SessionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SessionState {
    Opening = 0,
    Open = 1,
    Closed = 2,
}

impl From<u8> for SessionState {
    fn from(value: u8) -> Self {
        match value {
            0 => SessionState::Opening,
            1 => SessionState::Open,
            _ => SessionState::Closed,
        }
    }
}

/// A live SSE session: the outbound channel the axum stream reads from, plus
/// the atomic state used to make `close()` idempotent across concurrent
/// callers (the handler task and a POST handler can both race to close it).
pub struct SseSession {
    id: SessionId,
    state: AtomicU8,
    sender: mpsc::UnboundedSender<Value>,
}

impl SseSession {
    /// Create a new session in `Opening` state, returning the session along
    /// with the receiving half the SSE stream future should drain.
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<Value>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let session = Arc::new(Self {
            id: SessionId::new(),
            state: AtomicU8::new(SessionState::Opening as u8),
            sender,
        });
        (session, receiver)
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn state(&self) -> SessionState {
        SessionState::from(self.state.load(Ordering::SeqCst))
    }

    /// Transition `Opening -> Open`. A no-op once already `Open` or `Closed`.
    pub fn mark_open(&self) {
        let _ = self.state.compare_exchange(
            SessionState::Opening as u8,
            SessionState::Open as u8,
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
    }

    /// Queue a JSON-RPC message for delivery as a `message` SSE event.
    /// Fails if the session is closed.
    pub fn send(&self, message: Value) -> AggregatorResult<()> {
        if self.state() == SessionState::Closed {
            return Err(AggregatorError::Transport(format!(
                "session {} is closed",
                self.id
            )));
        }
        self.sender
            .send(message)
            .map_err(|_| AggregatorError::Transport(format!("session {} receiver dropped", self.id)))
    }

    /// Transition to `Closed`. Idempotent: returns `true` only the first
    /// time it actually performs the transition, so callers can use it to
    /// guard a one-shot `on_close` side effect.
    pub fn close(&self) -> bool {
        let previous = self.state.swap(SessionState::Closed as u8, Ordering::SeqCst);
        previous != SessionState::Closed as u8
    }
}

impl fmt::Debug for SseSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SseSession")
            .field("id", &self.id)
            .field("state", &self.state())
            .finish()
    }
}
