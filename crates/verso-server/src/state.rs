use std::sync::Arc;

use verso_gate::{AccessGate, GateConfig};
use verso_history::{HistoryConfig, SiteHistoryService};
use verso_ledger::SiteCatalog;
use verso_store::InMemoryBlobStore;

use crate::config::DEFAULT_MAX_CONTENT_BYTES;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub history: Arc<SiteHistoryService>,
    /// Request body limit applied by the router.
    pub max_content_bytes: usize,
}

impl AppState {
    pub fn new(history: Arc<SiteHistoryService>) -> Self {
        Self {
            history,
            max_content_bytes: DEFAULT_MAX_CONTENT_BYTES,
        }
    }

    pub fn with_max_content_bytes(mut self, limit: usize) -> Self {
        self.max_content_bytes = limit;
        self
    }

    /// Memory-only state with the default gate, for tests and demos.
    pub fn in_memory() -> Self {
        Self::in_memory_with_gate(GateConfig::default())
    }

    pub fn in_memory_with_gate(gate: GateConfig) -> Self {
        let service = SiteHistoryService::new(
            Arc::new(InMemoryBlobStore::new()),
            Arc::new(SiteCatalog::new()),
            AccessGate::new(gate),
            HistoryConfig::default(),
        );
        Self::new(Arc::new(service))
    }
}
