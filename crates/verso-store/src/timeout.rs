use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::{self, StreamExt};
use tracing::warn;
use verso_types::BlobId;

use crate::error::{StoreError, StoreResult};
use crate::traits::{BlobMetadata, BlobStore, BlobStream};

/// Bounds every operation of an inner store.
///
/// An operation that does not finish within the limit fails with
/// [`StoreError::Timeout`]. For streamed reads the limit applies to opening
/// the blob and, separately, to each chunk.
///
/// A timed-out purge may still complete in the inner store afterwards.
/// Callers treat it as failed and retry; purging an absent blob succeeds.
pub struct TimeoutStore {
    inner: Arc<dyn BlobStore>,
    limit: Duration,
}

impl TimeoutStore {
    pub fn new(inner: Arc<dyn BlobStore>, limit: Duration) -> Self {
        Self { inner, limit }
    }

    pub fn limit(&self) -> Duration {
        self.limit
    }

    async fn bounded<T>(
        &self,
        operation: &'static str,
        fut: impl Future<Output = StoreResult<T>>,
    ) -> StoreResult<T> {
        match tokio::time::timeout(self.limit, fut).await {
            Ok(result) => result,
            Err(_) => {
                warn!(operation, limit = ?self.limit, "blob store operation timed out");
                Err(StoreError::Timeout {
                    operation,
                    after: self.limit,
                })
            }
        }
    }
}

#[async_trait]
impl BlobStore for TimeoutStore {
    async fn store(&self, data: Bytes) -> StoreResult<BlobId> {
        self.bounded("store", self.inner.store(data)).await
    }

    async fn fetch(&self, id: &BlobId) -> StoreResult<Bytes> {
        self.bounded("fetch", self.inner.fetch(id)).await
    }

    async fn open(&self, id: &BlobId) -> StoreResult<BlobStream> {
        let inner = self.bounded("open", self.inner.open(id)).await?;
        let limit = self.limit;
        let chunks = stream::unfold(Some(inner), move |state| async move {
            let mut inner = state?;
            match tokio::time::timeout(limit, inner.next()).await {
                Ok(Some(chunk)) => Some((chunk, Some(inner))),
                Ok(None) => None,
                // Yield the timeout, then end the stream.
                Err(_) => Some((
                    Err(StoreError::Timeout {
                        operation: "read chunk",
                        after: limit,
                    }),
                    None,
                )),
            }
        });
        Ok(chunks.boxed())
    }

    async fn purge(&self, id: &BlobId) -> StoreResult<()> {
        self.bounded("purge", self.inner.purge(id)).await
    }

    async fn metadata(&self, id: &BlobId) -> StoreResult<BlobMetadata> {
        self.bounded("metadata", self.inner.metadata(id)).await
    }
}
