//! YAML configuration loading (C6).

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::AggregatorResult;
use crate::upstream::UpstreamDescriptor;

/// The on-disk shape of `--config <path>`: aggregator identity plus a map
/// of upstream name -> descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatorConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub servers: HashMap<String, UpstreamDescriptor>,
}

fn default_name() -> String {
    "mcgravity".to_string()
}

fn default_version() -> String {
    "1.0.0".to_string()
}

impl AggregatorConfig {
    pub fn load(path: impl AsRef<Path>) -> AggregatorResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&text)?)
    }
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            version: default_version(),
            description: None,
            servers: HashMap::new(),
        }
    }
}
