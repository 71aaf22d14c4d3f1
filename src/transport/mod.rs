//! SSE session transport (C1): the frontend-facing half of the aggregator.

pub mod session;
pub mod sse;

pub use session::{SessionId, SessionState, SseSession};
