//! Capability registry (C3)
//!
//! Records which upstream advertised which capability name so the router
//! can dispatch at call time. The registry never holds live connections,
//! only descriptors.

use dashmap::DashMap;

use crate::upstream::UpstreamDescriptor;

/// Maps an upstream key (its stringified URL) to its descriptor.
#[derive(Debug, Default)]
pub struct CapabilityRegistry {
    upstreams: DashMap<String, UpstreamDescriptor>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the descriptor for `upstream_key`.
    pub fn put(&self, upstream_key: String, descriptor: UpstreamDescriptor) {
        self.upstreams.insert(upstream_key, descriptor);
    }

    /// Look up the descriptor for `upstream_key`.
    pub fn get(&self, upstream_key: &str) -> Option<UpstreamDescriptor> {
        self.upstreams.get(upstream_key).map(|e| e.value().clone())
    }

    /// All currently registered descriptors, in no particular order.
    pub fn list(&self) -> Vec<UpstreamDescriptor> {
        self.upstreams.iter().map(|e| e.value().clone()).collect()
    }

    /// Remove an upstream's descriptor, e.g. on permanent loss.
    pub fn remove(&self, upstream_key: &str) {
        self.upstreams.remove(upstream_key);
    }

    pub fn len(&self) -> usize {
        self.upstreams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.upstreams.is_empty()
    }
}
