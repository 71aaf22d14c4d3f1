//! HTTP frontend (C5): axum routes, shared state, and the JSON-RPC POST path.

pub mod routes;
pub mod state;

pub use state::AppState;
