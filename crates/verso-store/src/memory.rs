use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::{self, StreamExt};
use verso_types::BlobId;

use crate::error::{StoreError, StoreResult};
use crate::traits::{BlobMetadata, BlobStore, BlobStream};
use crate::DEFAULT_CHUNK_SIZE;

#[derive(Clone)]
struct StoredBlob {
    data: Bytes,
    metadata: BlobMetadata,
}

/// In-memory, HashMap-based blob store.
///
/// Intended for tests and embedding. Blobs live behind a `RwLock`; reads
/// hand out cheap `Bytes` clones.
pub struct InMemoryBlobStore {
    blobs: RwLock<HashMap<BlobId, StoredBlob>>,
    chunk_size: usize,
}

impl InMemoryBlobStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self::with_chunk_size(DEFAULT_CHUNK_SIZE)
    }

    /// Create a store whose streamed reads yield chunks of `chunk_size` bytes.
    pub fn with_chunk_size(chunk_size: usize) -> Self {
        Self {
            blobs: RwLock::new(HashMap::new()),
            chunk_size: chunk_size.max(1),
        }
    }

    /// Number of blobs currently stored.
    pub fn len(&self) -> usize {
        self.blobs.read().expect("lock poisoned").len()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.blobs.read().expect("lock poisoned").is_empty()
    }

    /// Total bytes across all stored blobs.
    pub fn total_bytes(&self) -> u64 {
        self.blobs
            .read()
            .expect("lock poisoned")
            .values()
            .map(|blob| blob.metadata.size)
            .sum()
    }

    /// Return a sorted list of all blob IDs in the store.
    pub fn all_ids(&self) -> Vec<BlobId> {
        let map = self.blobs.read().expect("lock poisoned");
        let mut ids: Vec<BlobId> = map.keys().copied().collect();
        ids.sort();
        ids
    }

    fn get(&self, id: &BlobId) -> StoreResult<StoredBlob> {
        let map = self.blobs.read().expect("lock poisoned");
        map.get(id).cloned().ok_or(StoreError::NotFound(*id))
    }
}

impl Default for InMemoryBlobStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn store(&self, data: Bytes) -> StoreResult<BlobId> {
        let id = BlobId::generate();
        let metadata = BlobMetadata::for_content(&data);
        let mut map = self.blobs.write().expect("lock poisoned");
        map.insert(id, StoredBlob { data, metadata });
        Ok(id)
    }

    async fn fetch(&self, id: &BlobId) -> StoreResult<Bytes> {
        Ok(self.get(id)?.data)
    }

    async fn open(&self, id: &BlobId) -> StoreResult<BlobStream> {
        let data = self.get(id)?.data;
        let chunks: Vec<StoreResult<Bytes>> = (0..data.len())
            .step_by(self.chunk_size)
            .map(|start| {
                let end = (start + self.chunk_size).min(data.len());
                Ok(data.slice(start..end))
            })
            .collect();
        Ok(stream::iter(chunks).boxed())
    }

    async fn purge(&self, id: &BlobId) -> StoreResult<()> {
        let mut map = self.blobs.write().expect("lock poisoned");
        map.remove(id);
        Ok(())
    }

    async fn metadata(&self, id: &BlobId) -> StoreResult<BlobMetadata> {
        Ok(self.get(id)?.metadata)
    }
}

impl std::fmt::Debug for InMemoryBlobStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryBlobStore")
            .field("blob_count", &self.len())
            .field("chunk_size", &self.chunk_size)
            .finish()
    }
}
