//! Upstream MCP servers: their descriptors and the client used to reach them.

pub mod client;
pub mod descriptor;

pub use client::UpstreamClient;
pub use descriptor::{UpstreamDescriptor, UpstreamHandle, UpstreamStatus};
