//! Blob purging and the orphan queue.
//!
//! Purges go through the [`Purger`] trait. [`ForegroundPurger`] deletes the
//! blob in the caller's task and reports failure immediately; a queued or
//! batched implementation can replace it without touching the ledger logic.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use verso_store::{BlobStore, StoreResult};
use verso_types::BlobId;

/// Permanently deletes blobs that no ledger references any more.
#[async_trait]
pub trait Purger: Send + Sync {
    /// Delete `blob_id`. Returns `Ok` only once the blob is gone; purging an
    /// absent blob succeeds.
    async fn purge(&self, blob_id: &BlobId) -> StoreResult<()>;
}

/// Purges synchronously against the blob store.
pub struct ForegroundPurger {
    store: Arc<dyn BlobStore>,
}

impl ForegroundPurger {
    pub fn new(store: Arc<dyn BlobStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Purger for ForegroundPurger {
    async fn purge(&self, blob_id: &BlobId) -> StoreResult<()> {
        self.store.purge(blob_id).await
    }
}

/// Unreferenced blobs whose purge failed and is waiting for a retry.
#[derive(Debug, Default)]
pub struct OrphanQueue {
    blobs: Mutex<BTreeSet<BlobId>>,
}

impl OrphanQueue {
    pub fn push(&self, blob_id: BlobId) {
        self.blobs.lock().expect("lock poisoned").insert(blob_id);
    }

    pub fn remove(&self, blob_id: &BlobId) -> bool {
        self.blobs.lock().expect("lock poisoned").remove(blob_id)
    }

    pub fn len(&self) -> usize {
        self.blobs.lock().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Queued blob IDs in ID order (oldest first, since IDs are time-ordered).
    pub fn snapshot(&self) -> Vec<BlobId> {
        self.blobs.lock().expect("lock poisoned").iter().copied().collect()
    }
}
