//! Blob storage for verso.
//!
//! Site content is kept as immutable blobs in a [`BlobStore`]. The store
//! assigns every blob a fresh [`BlobId`](verso_types::BlobId) and records its
//! size, creation time, and BLAKE3 digest. Stores may be remote, slow, or
//! flaky, so every operation is async and every failure surfaces as a
//! [`StoreError`].
//!
//! # Backends
//!
//! - [`InMemoryBlobStore`] -- `HashMap`-based store for tests and embedding
//! - [`FsBlobStore`] -- one file per blob plus a JSON metadata sidecar
//!
//! # Wrappers
//!
//! - [`TimeoutStore`] -- bounds every operation; an expired call is a
//!   [`StoreError::Timeout`], never a success
//! - [`FaultInjectingStore`] -- counts calls and injects failures or delays
//!
//! # Design Rules
//!
//! 1. Blobs are immutable once written.
//! 2. Write-then-link: the blob is fully written before its ID is returned.
//! 3. Purge is idempotent: purging an absent blob succeeds.
//! 4. Downloads stream in chunks; callers never need the whole blob in memory.
//! 5. All I/O errors are propagated, never silently ignored.

pub mod config;
pub mod error;
pub mod faulty;
pub mod fs;
pub mod memory;
pub mod timeout;
pub mod traits;

pub use config::{StoreBackend, StoreConfig};
pub use error::{StoreError, StoreResult};
pub use faulty::{FaultInjectingStore, StoreOp};
pub use fs::FsBlobStore;
pub use memory::InMemoryBlobStore;
pub use timeout::TimeoutStore;
pub use traits::{BlobMetadata, BlobStore, BlobStream};

/// Default chunk size for streamed reads (64 KiB).
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;
