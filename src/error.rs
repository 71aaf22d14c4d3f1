//! Error types for mcgravity
//!
//! Follows the taxonomy laid out for the aggregator: transport-level faults
//! are recovered locally, protocol- and invocation-level faults are
//! surfaced to the caller, and configuration faults are fatal at startup.

use thiserror::Error;

/// Result type for aggregator operations.
pub type AggregatorResult<T> = std::result::Result<T, AggregatorError>;

/// Main error type for mcgravity.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum AggregatorError {
    /// SSE transport fault: stream closed, write failure, malformed frame.
    #[error("transport error: {0}")]
    Transport(String),

    /// JSON-RPC message failed to parse or validate against the profile.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Could not reach or handshake an upstream MCP server.
    #[error("failed to connect upstream {url}: {message}")]
    UpstreamConnect { url: String, message: String },

    /// An upstream responded with an error or closed mid-call.
    #[error("upstream {url} invocation failed: {message}")]
    UpstreamInvocation { url: String, message: String },

    /// A capability's upstream descriptor was missing from the registry at
    /// dispatch time (`ClientNotFound`).
    #[error("no upstream registered for capability '{0}'")]
    ClientNotFound(String),

    /// Invalid YAML configuration or schema mismatch. Fatal at startup.
    #[error("configuration error: {message}")]
    Config { message: String },

    /// JSON (de)serialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML (de)serialization failure.
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Underlying I/O failure (binding a listener, reading a config file).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Outbound HTTP request to an upstream failed.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// A configured upstream URL did not parse as an absolute URL.
    #[error("invalid upstream url: {0}")]
    UrlParse(#[from] url::ParseError),
}

impl AggregatorError {
    /// Construct an `UpstreamConnect` error.
    pub fn upstream_connect(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::UpstreamConnect {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Construct an `UpstreamInvocation` error.
    pub fn upstream_invocation(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::UpstreamInvocation {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Construct a `Config` error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Whether this error is worth a reconnect/retry loop rather than being
    /// fatal to the whole process.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::UpstreamConnect { .. } | Self::Http(_) | Self::Io(_)
        )
    }

    /// Message safe to hand back to a downstream JSON-RPC caller: strips
    /// internal detail for the taxonomy entries that shouldn't leak it.
    pub fn sanitize(&self) -> String {
        match self {
            Self::Transport(_) => "transport error occurred".to_string(),
            Self::Protocol(msg) => format!("protocol error: {msg}"),
            Self::UpstreamConnect { url, .. } => format!("upstream '{url}' unreachable"),
            Self::UpstreamInvocation { url, message } => {
                format!("upstream '{url}' error: {message}")
            }
            Self::ClientNotFound(name) => format!("no upstream registered for '{name}'"),
            Self::Config { .. } => "configuration error".to_string(),
            Self::Serialization(_) => "malformed JSON".to_string(),
            Self::Yaml(_) => "malformed YAML".to_string(),
            Self::Io(_) => "io error occurred".to_string(),
            Self::Http(_) => "upstream http error".to_string(),
            Self::UrlParse(_) => "invalid upstream url".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_not_found_message_names_capability() {
        let err = AggregatorError::ClientNotFound("echo".to_string());
        assert!(err.to_string().contains("echo"));
    }

    #[test]
    fn retryable_classification() {
        assert!(AggregatorError::upstream_connect("http://x", "refused").is_retryable());
        assert!(!AggregatorError::config("bad yaml").is_retryable());
    }

    #[test]
    fn sanitize_hides_internal_detail_for_config_errors() {
        let err = AggregatorError::config("secret path /etc/shadow missing key");
        assert_eq!(err.sanitize(), "configuration error");
    }
}
