//! Filesystem blob store.
//!
//! On-disk layout:
//! ```text
//! <root>/<last two chars of id>/<id>.blob   raw bytes
//! <root>/<last two chars of id>/<id>.meta   JSON-encoded BlobMetadata
//! ```
//!
//! Both files are written under a temporary name and renamed into place, the
//! metadata last. A blob without a `.meta` file does not exist.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures_util::stream::{self, StreamExt};
use tokio::io::AsyncReadExt;
use tracing::debug;
use verso_types::BlobId;

use crate::error::{StoreError, StoreResult};
use crate::traits::{BlobMetadata, BlobStore, BlobStream};
use crate::DEFAULT_CHUNK_SIZE;

/// Blob store keeping one file per blob under a root directory.
#[derive(Debug)]
pub struct FsBlobStore {
    root: PathBuf,
    chunk_size: usize,
}

impl FsBlobStore {
    /// Open (creating if needed) a store rooted at `root`.
    pub async fn open_dir(root: impl Into<PathBuf>) -> StoreResult<Self> {
        Self::open_dir_with_chunk_size(root, DEFAULT_CHUNK_SIZE).await
    }

    pub async fn open_dir_with_chunk_size(
        root: impl Into<PathBuf>,
        chunk_size: usize,
    ) -> StoreResult<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self {
            root,
            chunk_size: chunk_size.max(1),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The leading characters of a v7 id are its timestamp, so shard on the
    /// random tail instead.
    fn shard_dir(&self, id: &BlobId) -> PathBuf {
        let key = id.to_key();
        self.root.join(&key[key.len() - 2..])
    }

    fn blob_path(&self, id: &BlobId) -> PathBuf {
        self.shard_dir(id).join(format!("{}.blob", id.to_key()))
    }

    fn meta_path(&self, id: &BlobId) -> PathBuf {
        self.shard_dir(id).join(format!("{}.meta", id.to_key()))
    }

    async fn read_metadata(&self, id: &BlobId) -> StoreResult<BlobMetadata> {
        let raw = tokio::fs::read(self.meta_path(id))
            .await
            .map_err(|e| not_found_or_io(e, id))?;
        serde_json::from_slice(&raw).map_err(|e| StoreError::Serialization(e.to_string()))
    }
}

fn not_found_or_io(err: std::io::Error, id: &BlobId) -> StoreError {
    if err.kind() == ErrorKind::NotFound {
        StoreError::NotFound(*id)
    } else {
        StoreError::Io(err)
    }
}

async fn write_atomic(path: &Path, data: &[u8]) -> StoreResult<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    tokio::fs::write(&tmp, data).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

async fn remove_if_present(path: &Path) -> StoreResult<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(StoreError::Io(e)),
    }
}

async fn next_chunk(
    mut file: tokio::fs::File,
    chunk_size: usize,
) -> StoreResult<Option<(Bytes, tokio::fs::File)>> {
    let mut buf = BytesMut::zeroed(chunk_size);
    let n = file.read(&mut buf).await?;
    if n == 0 {
        return Ok(None);
    }
    buf.truncate(n);
    Ok(Some((buf.freeze(), file)))
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn store(&self, data: Bytes) -> StoreResult<BlobId> {
        let id = BlobId::generate();
        let metadata = BlobMetadata::for_content(&data);
        let encoded =
            serde_json::to_vec(&metadata).map_err(|e| StoreError::Serialization(e.to_string()))?;

        tokio::fs::create_dir_all(self.shard_dir(&id)).await?;
        write_atomic(&self.blob_path(&id), &data).await?;
        write_atomic(&self.meta_path(&id), &encoded).await?;

        debug!(blob = %id, size = metadata.size, "stored blob");
        Ok(id)
    }

    async fn fetch(&self, id: &BlobId) -> StoreResult<Bytes> {
        let metadata = self.read_metadata(id).await?;
        let data = tokio::fs::read(self.blob_path(id))
            .await
            .map_err(|e| not_found_or_io(e, id))?;
        metadata.verify(id, &data)?;
        Ok(Bytes::from(data))
    }

    async fn open(&self, id: &BlobId) -> StoreResult<BlobStream> {
        // Existence is defined by the sidecar.
        self.read_metadata(id).await?;
        let file = tokio::fs::File::open(self.blob_path(id))
            .await
            .map_err(|e| not_found_or_io(e, id))?;

        let chunk_size = self.chunk_size;
        let chunks = stream::try_unfold(file, move |file| next_chunk(file, chunk_size));
        Ok(chunks.boxed())
    }

    async fn purge(&self, id: &BlobId) -> StoreResult<()> {
        let meta = self.meta_path(id);
        let blob = self.blob_path(id);
        // Sidecar first: once it is gone the blob no longer exists, even if
        // removing the data file fails. The removal runs as its own task so
        // it finishes even when the caller stops waiting for it.
        let removal = tokio::spawn(async move {
            remove_if_present(&meta).await?;
            remove_if_present(&blob).await
        });
        removal
            .await
            .map_err(|e| StoreError::Unavailable(format!("purge task failed: {e}")))??;
        debug!(blob = %id, "purged blob");
        Ok(())
    }

    async fn metadata(&self, id: &BlobId) -> StoreResult<BlobMetadata> {
        self.read_metadata(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use futures_util::TryStreamExt;

    async fn temp_store(chunk_size: usize) -> (tempfile::TempDir, FsBlobStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::open_dir_with_chunk_size(dir.path().join("blobs"), chunk_size)
            .await
            .unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn store_fetch_and_metadata() {
        let (_dir, store) = temp_store(DEFAULT_CHUNK_SIZE).await;
        let id = store.store(Bytes::from_static(b"<html>v1</html>")).await.unwrap();

        assert_eq!(store.fetch(&id).await.unwrap(), Bytes::from_static(b"<html>v1</html>"));
        let meta = store.metadata(&id).await.unwrap();
        assert_eq!(meta.size, 15);
        assert!(store.blob_path(&id).starts_with(store.root()));
    }

    #[tokio::test]
    async fn open_streams_file_in_chunks() {
        let (_dir, store) = temp_store(3).await;
        let id = store.store(Bytes::from_static(b"abcdefgh")).await.unwrap();

        let chunks: Vec<Bytes> = store.open(&id).await.unwrap().try_collect().await.unwrap();
        assert!(chunks.iter().all(|c| c.len() <= 3));
        assert_eq!(chunks.concat(), b"abcdefgh");
    }

    #[tokio::test]
    async fn purge_removes_both_files() {
        let (_dir, store) = temp_store(DEFAULT_CHUNK_SIZE).await;
        let id = store.store(Bytes::from_static(b"bye")).await.unwrap();

        store.purge(&id).await.unwrap();
        assert!(!store.blob_path(&id).exists());
        assert!(!store.meta_path(&id).exists());
        assert!(store.fetch(&id).await.unwrap_err().is_not_found());
        assert!(matches!(store.open(&id).await, Err(StoreError::NotFound(_))));

        // Idempotent.
        store.purge(&id).await.unwrap();
    }

    #[tokio::test]
    async fn abandoned_purge_still_removes_both_files() {
        let (_dir, store) = temp_store(DEFAULT_CHUNK_SIZE).await;
        let id = store.store(Bytes::from_static(b"bye")).await.unwrap();

        let waited = tokio::time::timeout(Duration::ZERO, store.purge(&id)).await;
        assert!(waited.is_err());

        for _ in 0..200 {
            if !store.blob_path(&id).exists() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(!store.meta_path(&id).exists());
        assert!(!store.blob_path(&id).exists());
    }

    #[tokio::test]
    async fn shards_spread_across_directories() {
        let (_dir, store) = temp_store(DEFAULT_CHUNK_SIZE).await;
        let shards: std::collections::HashSet<PathBuf> = (0..64)
            .map(|_| store.shard_dir(&BlobId::generate()))
            .collect();
        assert!(shards.len() > 1);

        let id = BlobId::generate();
        let key = id.to_key();
        assert!(store.shard_dir(&id).ends_with(&key[key.len() - 2..]));
    }

    #[tokio::test]
    async fn fetch_detects_tampering() {
        let (_dir, store) = temp_store(DEFAULT_CHUNK_SIZE).await;
        let id = store.store(Bytes::from_static(b"original")).await.unwrap();
        tokio::fs::write(store.blob_path(&id), b"tampered").await.unwrap();

        let err = store.fetch(&id).await.unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }));
    }

    #[tokio::test]
    async fn reopening_sees_existing_blobs() {
        let dir = tempfile::tempdir().unwrap();
        let id = {
            let store = FsBlobStore::open_dir(dir.path()).await.unwrap();
            store.store(Bytes::from_static(b"persisted")).await.unwrap()
        };
        let store = FsBlobStore::open_dir(dir.path()).await.unwrap();
        assert!(store.exists(&id).await.unwrap());
    }
}
