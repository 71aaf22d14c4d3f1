//! Composer (C4): registers configured upstreams into the [`ExposedServer`]
//! and retries failed or lost registrations on a fixed interval.
//!
//! Because upstream connections are opened per-invocation (see
//! `upstream::client`), there is no persistent stream whose drop signals
//! "upstream gone" — loss is instead discovered by a forwarded call failing
//! with a retryable error. `handle_upstream_loss` is the seam where that
//! discovery feeds back into the reconnect loop.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tracing::{info, warn};

use crate::error::AggregatorResult;
use crate::registry::CapabilityRegistry;
use crate::server::ExposedServer;
use crate::upstream::{UpstreamClient, UpstreamDescriptor, UpstreamHandle, UpstreamStatus};

/// Fixed retry interval for both initial registration and reconnection.
const RECONNECT_INTERVAL: Duration = Duration::from_secs(10);

pub struct Composer {
    server: Arc<ExposedServer>,
    registry: Arc<CapabilityRegistry>,
    handles: DashMap<String, UpstreamHandle>,
}

impl Composer {
    pub fn new(server: Arc<ExposedServer>, registry: Arc<CapabilityRegistry>) -> Self {
        Self { server, registry, handles: DashMap::new() }
    }

    /// Current lifecycle state of a configured upstream, if it's known.
    pub fn handle(&self, upstream_key: &str) -> Option<UpstreamHandle> {
        self.handles.get(upstream_key).map(|e| e.value().clone())
    }

    /// Register `descriptor` in the background, retrying every
    /// [`RECONNECT_INTERVAL`] until it succeeds. Returns immediately.
    pub fn spawn_registration(self: &Arc<Self>, descriptor: UpstreamDescriptor) {
        self.handles
            .insert(descriptor.key(), UpstreamHandle::new(descriptor.clone()));
        let this = Arc::clone(self);
        tokio::spawn(async move {
            this.register_with_retry(descriptor, false).await;
        });
    }

    /// Called when a forwarded call discovers its upstream is unreachable.
    /// Drops the live client immediately (so further calls fail fast with
    /// `ClientNotFound`) and schedules reconnection. Because the capability
    /// list was already installed, the retry loop skips re-enumeration and
    /// just re-validates liveness before reinstating the client.
    pub fn handle_upstream_loss(self: &Arc<Self>, descriptor: UpstreamDescriptor) {
        let upstream_key = descriptor.key();
        self.server.remove_upstream(&upstream_key);
        self.handles
            .entry(upstream_key.clone())
            .or_insert_with(|| UpstreamHandle::new(descriptor.clone()));
        self.mark_status(&upstream_key, UpstreamStatus::Failed, None);
        warn!(upstream = %descriptor.url, "upstream lost, scheduling reconnect");
        let this = Arc::clone(self);
        tokio::spawn(async move {
            this.register_with_retry(descriptor, true).await;
        });
    }

    fn mark_status(&self, upstream_key: &str, status: UpstreamStatus, last_error: Option<String>) {
        if let Some(mut handle) = self.handles.get_mut(upstream_key) {
            handle.status = status;
            handle.last_error = last_error;
        }
    }

    async fn register_with_retry(&self, descriptor: UpstreamDescriptor, initial_skip_enumerate: bool) {
        let mut skip_enumerate = initial_skip_enumerate;
        loop {
            match self.try_register(&descriptor, skip_enumerate).await {
                Ok(()) => {
                    info!(upstream = %descriptor.url, "upstream registered");
                    self.mark_status(&descriptor.key(), UpstreamStatus::Registered, None);
                    return;
                }
                Err(e) => {
                    warn!(upstream = %descriptor.url, error = %e, "registration failed, retrying in 10s");
                    self.mark_status(&descriptor.key(), UpstreamStatus::Failed, Some(e.sanitize()));
                    tokio::time::sleep(RECONNECT_INTERVAL).await;
                    // Only the first reconnect attempt after a known-good
                    // upstream is assumed still enumerable without
                    // re-fetching; once that attempt itself fails, fall
                    // back to a full re-enumeration on the next try.
                    skip_enumerate = false;
                }
            }
        }
    }

    async fn try_register(&self, descriptor: &UpstreamDescriptor, skip_enumerate: bool) -> AggregatorResult<()> {
        let upstream_key = descriptor.key();
        let client = UpstreamClient::new(descriptor.url.clone());

        if skip_enumerate {
            // Liveness check only: the capability tables already reflect
            // this upstream's tools/resources/prompts from its first
            // registration.
            client.list_tools().await?;
        } else {
            let tools = client.list_tools().await?;
            let resources = client.list_resources().await?;
            let prompts = client.list_prompts().await?;
            for tool in tools {
                self.server.install_tool(&upstream_key, tool);
            }
            for resource in resources {
                self.server.install_resource(&upstream_key, resource);
            }
            for prompt in prompts {
                self.server.install_prompt(&upstream_key, prompt);
            }
        }

        self.server.install_client(upstream_key.clone(), client);
        self.registry.put(upstream_key, descriptor.clone());
        Ok(())
    }
}
