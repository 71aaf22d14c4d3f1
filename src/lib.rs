//! mcgravity: a reverse proxy / aggregator for the Model Context Protocol.
//!
//! Exposes one MCP endpoint backed by any number of upstream MCP servers,
//! federating their tools, resources, and prompts behind a single SSE
//! transport and forwarding each invocation to whichever upstream
//! originally advertised it.

pub mod cli;
pub mod composer;
pub mod config;
pub mod error;
pub mod http;
pub mod protocol;
pub mod registry;
pub mod schema;
pub mod server;
pub mod transport;
pub mod upstream;

/// Commonly used types, re-exported for binary and integration-test use.
pub mod prelude {
    pub use crate::cli::Cli;
    pub use crate::composer::Composer;
    pub use crate::config::AggregatorConfig;
    pub use crate::error::{AggregatorError, AggregatorResult};
    pub use crate::http::AppState;
    pub use crate::registry::CapabilityRegistry;
    pub use crate::server::ExposedServer;
    pub use crate::upstream::{UpstreamClient, UpstreamDescriptor};
}

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
