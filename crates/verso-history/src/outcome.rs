//! Results returned by the history service.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use verso_gate::AccessLevel;
use verso_ledger::{SiteRecord, VersionEntry};
use verso_store::BlobStream;
use verso_types::{BlobId, SiteId};

/// What the history page shows.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HistorySummary {
    pub site: SiteId,
    pub access: AccessLevel,
    pub current_blob_id: BlobId,
    pub blob_created_at: DateTime<Utc>,
    pub saved_version_count: usize,
    pub keep_count: usize,
    pub save_count: u64,
    /// e.g. "saved 3 times, last saved 2024-05-01 12:00 UTC"
    pub activity: String,
    /// Newest first.
    pub versions: Vec<VersionEntry>,
}

impl HistorySummary {
    pub(crate) fn new(site: &SiteRecord, access: AccessLevel) -> Self {
        Self {
            site: site.id.clone(),
            access,
            current_blob_id: site.current_blob_id,
            blob_created_at: site.blob_created_at,
            saved_version_count: site.saved_version_count(),
            keep_count: site.keep_count(),
            save_count: site.save_count,
            activity: site.activity_summary(),
            versions: site.ledger.list().cloned().collect(),
        }
    }
}

/// A historical version rendered for display.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderedVersion {
    pub entry: VersionEntry,
    pub html: String,
}

/// A historical version ready to stream as a file attachment.
pub struct VersionDownload {
    pub entry: VersionEntry,
    pub filename: String,
    pub content_type: String,
    /// Byte length, for `Content-Length`.
    pub size: u64,
    pub stream: BlobStream,
}

impl fmt::Debug for VersionDownload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VersionDownload")
            .field("entry", &self.entry)
            .field("filename", &self.filename)
            .field("content_type", &self.content_type)
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

/// Blobs released by a mutation and what happened to them.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PurgeReport {
    pub purged: Vec<BlobId>,
    /// Purge failed; queued for [`sweep_orphans`](crate::SiteHistoryService::sweep_orphans).
    pub orphaned: Vec<BlobId>,
}

impl PurgeReport {
    pub fn is_clean(&self) -> bool {
        self.orphaned.is_empty()
    }
}

/// Result of a save, including restores and site creation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SaveOutcome {
    pub site: SiteId,
    /// The new version, now the site's current content.
    pub entry: VersionEntry,
    /// Versions dropped by the keep-count bound, oldest first.
    pub evicted: Vec<VersionEntry>,
    pub purge: PurgeReport,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RestoreOutcome {
    /// The historical version whose content was saved forward.
    pub restored_from: BlobId,
    pub saved: SaveOutcome,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DiscardOutcome {
    pub site: SiteId,
    pub removed: VersionEntry,
    pub saved_version_count: usize,
    /// False when the removal is only in memory so far; the next orphan
    /// sweep retries writing it.
    pub persisted: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct KeepCountOutcome {
    pub site: SiteId,
    pub keep_count: usize,
    pub evicted: Vec<VersionEntry>,
    pub purge: PurgeReport,
}

/// Result of retrying queued orphan purges and unpersisted site records.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub purged: Vec<BlobId>,
    pub remaining: Vec<BlobId>,
    /// Sites whose record still could not be written.
    pub unpersisted: Vec<SiteId>,
}
