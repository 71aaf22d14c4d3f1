//! Upstream descriptors and their lifecycle state.

use serde::{Deserialize, Deserializer, Serialize};
use url::Url;

/// Immutable identity of a configured upstream MCP server.
#[derive(Debug, Clone, Serialize)]
pub struct UpstreamDescriptor {
    /// Absolute URL whose scheme designates the SSE transport endpoint.
    pub url: Url,

    /// Human-readable name. Defaults to `url.host`.
    pub name: String,

    /// Upstream version string. Defaults to `"1.0.0"`.
    #[serde(default = "default_version")]
    pub version: String,

    /// Optional free-text description.
    #[serde(default)]
    pub description: Option<String>,

    /// Optional classification tags.
    #[serde(default)]
    pub tags: Vec<String>,
}

fn default_version() -> String {
    "1.0.0".to_string()
}

/// Shadow of [`UpstreamDescriptor`] whose `name` is optional, so a config
/// that omits it still deserializes with the same host-derived default
/// `from_url` applies.
#[derive(Deserialize)]
struct RawUpstreamDescriptor {
    url: Url,
    #[serde(default)]
    name: Option<String>,
    #[serde(default = "default_version")]
    version: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
}

impl<'de> Deserialize<'de> for UpstreamDescriptor {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = RawUpstreamDescriptor::deserialize(deserializer)?;
        let name = raw
            .name
            .unwrap_or_else(|| raw.url.host_str().unwrap_or("upstream").to_string());
        Ok(Self {
            url: raw.url,
            name,
            version: raw.version,
            description: raw.description,
            tags: raw.tags,
        })
    }
}

impl UpstreamDescriptor {
    /// Build a descriptor from a bare URL, applying the defaults from
    /// defaults (`name` from host, `version` = "1.0.0").
    pub fn from_url(url: Url) -> Self {
        let name = url.host_str().unwrap_or("upstream").to_string();
        Self {
            url,
            name,
            version: default_version(),
            description: None,
            tags: Vec::new(),
        }
    }

    /// The registry key for this upstream: its stringified URL.
    pub fn key(&self) -> String {
        self.url.to_string()
    }
}

/// Registration state of an [`UpstreamHandle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpstreamStatus {
    /// Connect+enumerate has not yet succeeded.
    Pending,
    /// Connect+enumerate succeeded; capabilities are installed.
    Registered,
    /// The most recent connect+enumerate attempt failed.
    Failed,
}

/// An upstream tracked by the composer across its registration lifecycle.
#[derive(Debug, Clone)]
pub struct UpstreamHandle {
    pub descriptor: UpstreamDescriptor,
    pub status: UpstreamStatus,
    pub last_error: Option<String>,
}

impl UpstreamHandle {
    pub fn new(descriptor: UpstreamDescriptor) -> Self {
        Self {
            descriptor,
            status: UpstreamStatus::Pending,
            last_error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_name_from_host_and_version() {
        let url = Url::parse("https://weather.example.com/sse").unwrap();
        let desc = UpstreamDescriptor::from_url(url);
        assert_eq!(desc.name, "weather.example.com");
        assert_eq!(desc.version, "1.0.0");
    }

    #[test]
    fn key_is_the_stringified_url() {
        let url = Url::parse("https://weather.example.com/sse").unwrap();
        let desc = UpstreamDescriptor::from_url(url.clone());
        assert_eq!(desc.key(), url.to_string());
    }

    #[test]
    fn deserializing_without_name_defaults_to_host() {
        let desc: UpstreamDescriptor =
            serde_yaml::from_str("url: https://weather.example.com/sse").unwrap();
        assert_eq!(desc.name, "weather.example.com");
        assert_eq!(desc.version, "1.0.0");
    }

    #[test]
    fn deserializing_with_name_keeps_it() {
        let desc: UpstreamDescriptor =
            serde_yaml::from_str("url: https://weather.example.com/sse\nname: custom").unwrap();
        assert_eq!(desc.name, "custom");
    }
}
