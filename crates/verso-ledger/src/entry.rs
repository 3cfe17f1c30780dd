use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use verso_types::{BlobId, SaveKind};

/// One saved version of a site. Immutable once recorded.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionEntry {
    /// Position in the site's history; strictly increasing, never reused.
    pub seq: u64,
    pub blob_id: BlobId,
    pub created_at: DateTime<Utc>,
    /// Content length in bytes, used for download headers.
    pub size: u64,
    pub kind: SaveKind,
}

/// A version about to be appended; the ledger assigns its sequence number.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewVersion {
    pub blob_id: BlobId,
    pub created_at: DateTime<Utc>,
    pub size: u64,
    pub kind: SaveKind,
}

impl NewVersion {
    pub fn new(blob_id: BlobId, created_at: DateTime<Utc>, size: u64, kind: SaveKind) -> Self {
        Self {
            blob_id,
            created_at,
            size,
            kind,
        }
    }

    pub(crate) fn into_entry(self, seq: u64) -> VersionEntry {
        VersionEntry {
            seq,
            blob_id: self.blob_id,
            created_at: self.created_at,
            size: self.size,
            kind: self.kind,
        }
    }
}
