//! Shared axum state: live sessions plus the aggregator's core services.

use std::sync::Arc;

use dashmap::DashMap;

use crate::composer::Composer;
use crate::registry::CapabilityRegistry;
use crate::server::ExposedServer;
use crate::transport::session::{SessionId, SseSession};

#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<DashMap<SessionId, Arc<SseSession>>>,
    pub server: Arc<ExposedServer>,
    pub composer: Arc<Composer>,
    pub registry: Arc<CapabilityRegistry>,
}

impl AppState {
    pub fn new(server: Arc<ExposedServer>, composer: Arc<Composer>, registry: Arc<CapabilityRegistry>) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            server,
            composer,
            registry,
        }
    }
}
