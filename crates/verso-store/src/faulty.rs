//! Fault injection for exercising slow or flaky blob stores.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use verso_types::BlobId;

use crate::error::{StoreError, StoreResult};
use crate::traits::{BlobMetadata, BlobStore, BlobStream};

/// The blob store operations a fault can target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Store,
    Fetch,
    Open,
    Purge,
    Metadata,
}

impl fmt::Display for StoreOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Store => "store",
            Self::Fetch => "fetch",
            Self::Open => "open",
            Self::Purge => "purge",
            Self::Metadata => "metadata",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Copy, Debug)]
enum Failure {
    Next(usize),
    Always,
}

#[derive(Default)]
struct FaultState {
    calls: HashMap<StoreOp, usize>,
    failures: HashMap<StoreOp, Failure>,
    delays: HashMap<StoreOp, Duration>,
}

/// Wraps a store, counting calls and injecting failures or delays.
///
/// Injected failures are [`StoreError::Unavailable`] and are reported
/// before the inner store is touched, so a failed purge leaves the blob in
/// place.
pub struct FaultInjectingStore {
    inner: Arc<dyn BlobStore>,
    state: Mutex<FaultState>,
}

impl FaultInjectingStore {
    pub fn new(inner: Arc<dyn BlobStore>) -> Self {
        Self {
            inner,
            state: Mutex::new(FaultState::default()),
        }
    }

    /// Fail the next `times` calls of `op`.
    pub fn fail_next(&self, op: StoreOp, times: usize) {
        let mut state = self.state.lock().expect("lock poisoned");
        state.failures.insert(op, Failure::Next(times));
    }

    /// Fail every call of `op` until [`Self::heal`] is called.
    pub fn fail_always(&self, op: StoreOp) {
        let mut state = self.state.lock().expect("lock poisoned");
        state.failures.insert(op, Failure::Always);
    }

    /// Clear all injected failures and delays.
    pub fn heal(&self) {
        let mut state = self.state.lock().expect("lock poisoned");
        state.failures.clear();
        state.delays.clear();
    }

    /// Sleep for `delay` before every call of `op`.
    pub fn set_delay(&self, op: StoreOp, delay: Duration) {
        let mut state = self.state.lock().expect("lock poisoned");
        state.delays.insert(op, delay);
    }

    /// How many times `op` has been called, failed calls included.
    pub fn calls(&self, op: StoreOp) -> usize {
        let state = self.state.lock().expect("lock poisoned");
        state.calls.get(&op).copied().unwrap_or(0)
    }

    /// Record a call and decide whether it should fail.
    async fn enter(&self, op: StoreOp) -> StoreResult<()> {
        let (delay, fail) = {
            let mut state = self.state.lock().expect("lock poisoned");
            *state.calls.entry(op).or_default() += 1;
            let fail = match state.failures.get_mut(&op) {
                Some(Failure::Always) => true,
                Some(Failure::Next(remaining)) if *remaining > 0 => {
                    *remaining -= 1;
                    true
                }
                _ => false,
            };
            (state.delays.get(&op).copied(), fail)
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if fail {
            return Err(StoreError::Unavailable(format!("injected {op} failure")));
        }
        Ok(())
    }
}

#[async_trait]
impl BlobStore for FaultInjectingStore {
    async fn store(&self, data: Bytes) -> StoreResult<BlobId> {
        self.enter(StoreOp::Store).await?;
        self.inner.store(data).await
    }

    async fn fetch(&self, id: &BlobId) -> StoreResult<Bytes> {
        self.enter(StoreOp::Fetch).await?;
        self.inner.fetch(id).await
    }

    async fn open(&self, id: &BlobId) -> StoreResult<BlobStream> {
        self.enter(StoreOp::Open).await?;
        self.inner.open(id).await
    }

    async fn purge(&self, id: &BlobId) -> StoreResult<()> {
        self.enter(StoreOp::Purge).await?;
        self.inner.purge(id).await
    }

    async fn metadata(&self, id: &BlobId) -> StoreResult<BlobMetadata> {
        self.enter(StoreOp::Metadata).await?;
        self.inner.metadata(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryBlobStore;

    fn faulty() -> FaultInjectingStore {
        FaultInjectingStore::new(Arc::new(InMemoryBlobStore::new()))
    }

    #[tokio::test]
    async fn counts_calls_per_operation() {
        let store = faulty();
        let id = store.store(Bytes::from_static(b"a")).await.unwrap();
        store.fetch(&id).await.unwrap();
        store.fetch(&id).await.unwrap();
        assert_eq!(store.calls(StoreOp::Store), 1);
        assert_eq!(store.calls(StoreOp::Fetch), 2);
        assert_eq!(store.calls(StoreOp::Purge), 0);
    }

    #[tokio::test]
    async fn fail_next_fails_then_recovers() {
        let store = faulty();
        let id = store.store(Bytes::from_static(b"a")).await.unwrap();
        store.fail_next(StoreOp::Purge, 1);

        let err = store.purge(&id).await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
        // The failed purge left the blob in place.
        assert!(store.exists(&id).await.unwrap());

        store.purge(&id).await.unwrap();
        assert!(!store.exists(&id).await.unwrap());
    }

    #[tokio::test]
    async fn fail_always_until_healed() {
        let store = faulty();
        store.fail_always(StoreOp::Store);
        assert!(store.store(Bytes::from_static(b"a")).await.is_err());
        assert!(store.store(Bytes::from_static(b"b")).await.is_err());

        store.heal();
        assert!(store.store(Bytes::from_static(b"c")).await.is_ok());
        assert_eq!(store.calls(StoreOp::Store), 3);
    }
}
