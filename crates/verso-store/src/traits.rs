use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures_util::stream::BoxStream;
use serde::{Deserialize, Serialize};
use verso_types::{BlobId, ContentDigest};

use crate::error::{StoreError, StoreResult};

/// A blob's bytes delivered as a sequence of chunks.
pub type BlobStream = BoxStream<'static, StoreResult<Bytes>>;

/// What the store knows about a blob without reading it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobMetadata {
    /// Size of the blob in bytes.
    pub size: u64,
    /// When the store created the blob.
    pub created_at: DateTime<Utc>,
    /// Digest of the blob's bytes, checked on full reads.
    pub digest: ContentDigest,
}

impl BlobMetadata {
    /// Metadata for freshly written content.
    pub fn for_content(data: &[u8]) -> Self {
        Self {
            size: data.len() as u64,
            created_at: Utc::now(),
            digest: ContentDigest::of(data),
        }
    }

    /// Check `data` against the recorded size and digest.
    pub fn verify(&self, id: &BlobId, data: &[u8]) -> StoreResult<()> {
        if data.len() as u64 != self.size {
            return Err(StoreError::Corrupt {
                id: *id,
                reason: format!("expected {} bytes, read {}", self.size, data.len()),
            });
        }
        let computed = ContentDigest::of(data);
        if computed != self.digest {
            return Err(StoreError::Corrupt {
                id: *id,
                reason: format!("digest mismatch: expected {}, computed {}", self.digest, computed),
            });
        }
        Ok(())
    }
}

/// Blob storage consumed by the history service.
///
/// All implementations must satisfy these invariants:
/// - `store` assigns a fresh ID on every call, even for identical bytes.
/// - A blob is readable as soon as `store` returns its ID.
/// - `purge` of an absent blob succeeds, so a purge can always be retried.
/// - Reads of a purged blob fail with [`StoreError::NotFound`].
/// - All I/O errors are propagated, never silently ignored.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store a new blob and return the ID assigned to it.
    async fn store(&self, data: Bytes) -> StoreResult<BlobId>;

    /// Read a blob's full contents.
    async fn fetch(&self, id: &BlobId) -> StoreResult<Bytes>;

    /// Open a blob for chunked reading.
    ///
    /// Fails with [`StoreError::NotFound`] before any chunk is produced if
    /// the blob does not exist.
    async fn open(&self, id: &BlobId) -> StoreResult<BlobStream>;

    /// Permanently delete a blob.
    async fn purge(&self, id: &BlobId) -> StoreResult<()>;

    /// Size, creation time, and digest of a blob.
    async fn metadata(&self, id: &BlobId) -> StoreResult<BlobMetadata>;

    /// Check whether a blob exists.
    async fn exists(&self, id: &BlobId) -> StoreResult<bool> {
        match self.metadata(id).await {
            Ok(_) => Ok(true),
            Err(StoreError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }
}
