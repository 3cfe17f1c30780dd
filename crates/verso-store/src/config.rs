use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::StoreResult;
use crate::fs::FsBlobStore;
use crate::memory::InMemoryBlobStore;
use crate::timeout::TimeoutStore;
use crate::traits::BlobStore;
use crate::DEFAULT_CHUNK_SIZE;

/// Which blob store backend to run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StoreBackend {
    /// Blobs live in process memory and vanish on exit.
    Memory,
    /// Blobs live under `root` on the local filesystem.
    Filesystem { root: PathBuf },
}

/// Blob store configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// Upper bound on any single store operation. Zero disables the bound.
    pub timeout_ms: u64,
    /// Chunk size for streamed downloads.
    pub chunk_size: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Memory,
            timeout_ms: 10_000,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl StoreConfig {
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_ms > 0).then(|| Duration::from_millis(self.timeout_ms))
    }

    /// Construct the configured backend, wrapped in a [`TimeoutStore`] when a
    /// timeout is set.
    pub async fn build(&self) -> StoreResult<Arc<dyn BlobStore>> {
        let backend: Arc<dyn BlobStore> = match &self.backend {
            StoreBackend::Memory => Arc::new(InMemoryBlobStore::with_chunk_size(self.chunk_size)),
            StoreBackend::Filesystem { root } => Arc::new(
                FsBlobStore::open_dir_with_chunk_size(root.clone(), self.chunk_size).await?,
            ),
        };
        info!(backend = ?self.backend, timeout_ms = self.timeout_ms, "blob store ready");

        Ok(match self.timeout() {
            Some(limit) => Arc::new(TimeoutStore::new(backend, limit)),
            None => backend,
        })
    }
}
