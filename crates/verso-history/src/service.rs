use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use tracing::{debug, info, warn};
use verso_gate::{AccessContext, AccessGate, Operation};
use verso_ledger::{NewVersion, SiteCatalog, SiteGuard, SiteRecord};
use verso_store::BlobStore;
use verso_types::{BlobId, SaveKind, SiteId};

use crate::config::HistoryConfig;
use crate::error::{HistoryError, HistoryResult};
use crate::outcome::{
    DiscardOutcome, HistorySummary, KeepCountOutcome, PurgeReport, RenderedVersion,
    RestoreOutcome, SaveOutcome, SweepReport, VersionDownload,
};
use crate::purge::{ForegroundPurger, OrphanQueue, Purger};
use crate::render::{ContentRenderer, HtmlPassthrough, RenderContext};

// ---------------------------------------------------------------------------
// SiteHistoryService
// ---------------------------------------------------------------------------

/// Browses and edits the saved versions of every hosted site.
///
/// Gated operations (`history`, `view_version`, `download_version`,
/// `restore_version`, `discard_version`) take an [`AccessContext`] and are
/// authorized before the site is even looked up. Saves, site creation, and
/// keep-count changes are owner actions and are not gated here.
///
/// Every operation that reads or changes a ledger holds the site's lock for
/// its whole duration, blob store calls included.
pub struct SiteHistoryService {
    store: Arc<dyn BlobStore>,
    catalog: Arc<SiteCatalog>,
    gate: AccessGate,
    purger: Arc<dyn Purger>,
    renderer: Arc<dyn ContentRenderer>,
    orphans: OrphanQueue,
    config: HistoryConfig,
}

impl SiteHistoryService {
    /// A service that purges in the foreground and serves HTML unchanged.
    pub fn new(
        store: Arc<dyn BlobStore>,
        catalog: Arc<SiteCatalog>,
        gate: AccessGate,
        config: HistoryConfig,
    ) -> Self {
        let purger = Arc::new(ForegroundPurger::new(Arc::clone(&store)));
        Self {
            store,
            catalog,
            gate,
            purger,
            renderer: Arc::new(HtmlPassthrough),
            orphans: OrphanQueue::default(),
            config,
        }
    }

    pub fn with_purger(mut self, purger: Arc<dyn Purger>) -> Self {
        self.purger = purger;
        self
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn ContentRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn gate(&self) -> &AccessGate {
        &self.gate
    }

    pub fn catalog(&self) -> &Arc<SiteCatalog> {
        &self.catalog
    }

    pub fn config(&self) -> &HistoryConfig {
        &self.config
    }

    /// Resolve the configured capability flags for a request on `site`.
    pub fn context_for(&self, site: SiteId) -> AccessContext {
        self.gate.context_for(site)
    }

    // -----------------------------------------------------------------------
    // Sites and saves
    // -----------------------------------------------------------------------

    /// Create a site whose first version is `content`.
    ///
    /// Uses the configured default keep-count when `keep_count` is `None`.
    pub async fn create_site(
        &self,
        site: SiteId,
        keep_count: Option<usize>,
        content: Bytes,
    ) -> HistoryResult<SaveOutcome> {
        if self.catalog.contains(&site) {
            return Err(HistoryError::SiteExists(site));
        }
        let keep_count = keep_count.unwrap_or(self.config.default_keep_count);

        let version = self.store_version(content, SaveKind::Initial).await?;
        let blob_id = version.blob_id;
        let created = SiteRecord::create(site.clone(), keep_count, version)
            .map_err(HistoryError::from);
        let result = match created {
            Ok((record, appended)) => self
                .catalog
                .insert(record)
                .await
                .map(|()| appended)
                .map_err(HistoryError::from),
            Err(e) => Err(e),
        };

        match result {
            Ok(appended) => {
                info!(%site, blob = %blob_id, keep_count, "created site");
                Ok(SaveOutcome {
                    site,
                    entry: appended.entry,
                    evicted: appended.evicted,
                    purge: PurgeReport::default(),
                })
            }
            Err(e) => {
                self.release_unlinked(&site, blob_id).await;
                Err(e)
            }
        }
    }

    /// Store `content` as the site's new current version.
    pub async fn save(
        &self,
        site: &SiteId,
        content: Bytes,
        kind: SaveKind,
    ) -> HistoryResult<SaveOutcome> {
        let mut guard = self.catalog.lock(site).await?;
        self.save_locked(&mut guard, content, kind).await
    }

    async fn save_locked(
        &self,
        guard: &mut SiteGuard,
        content: Bytes,
        kind: SaveKind,
    ) -> HistoryResult<SaveOutcome> {
        let previous = guard.current_blob_id;
        let version = self.store_version(content, kind).await?;
        let blob_id = version.blob_id;

        let appended = match self
            .catalog
            .update(guard, |record| record.apply_save(version))
            .await
        {
            Ok(appended) => appended,
            Err(e) => {
                let site = guard.id.clone();
                self.release_unlinked(&site, blob_id).await;
                return Err(e.into());
            }
        };

        // With a small keep-count the outgoing content may already be
        // outside the ledger; once it stops being current nothing holds it.
        let mut released: Vec<BlobId> = appended.evicted.iter().map(|e| e.blob_id).collect();
        if !guard.ledger.contains(&previous) && !released.contains(&previous) {
            released.push(previous);
        }
        let purge = self.release(guard, released).await;

        info!(
            site = %guard.id,
            blob = %blob_id,
            %kind,
            evicted = appended.evicted.len(),
            "saved version"
        );
        Ok(SaveOutcome {
            site: guard.id.clone(),
            entry: appended.entry,
            evicted: appended.evicted,
            purge,
        })
    }

    /// Change a site's keep-count, pruning and purging immediately.
    pub async fn set_keep_count(
        &self,
        site: &SiteId,
        keep_count: usize,
    ) -> HistoryResult<KeepCountOutcome> {
        let mut guard = self.catalog.lock(site).await?;
        let evicted = self
            .catalog
            .update(&mut guard, |record| Ok(record.ledger.set_keep_count(keep_count)))
            .await?;

        let released = evicted.iter().map(|e| e.blob_id).collect();
        let purge = self.release(&guard, released).await;
        info!(%site, keep_count, evicted = evicted.len(), "changed keep-count");
        Ok(KeepCountOutcome {
            site: site.clone(),
            keep_count,
            evicted,
            purge,
        })
    }

    // -----------------------------------------------------------------------
    // Gated operations
    // -----------------------------------------------------------------------

    /// Current content pointer, counters, and versions newest-first.
    pub async fn history(&self, ctx: &AccessContext) -> HistoryResult<HistorySummary> {
        let access = self.gate.authorize(Operation::History, ctx)?;
        let site = self.catalog.snapshot(&ctx.site).await?;
        Ok(HistorySummary::new(&site, access))
    }

    /// Render one historical version for display.
    pub async fn view_version(
        &self,
        ctx: &AccessContext,
        blob_id: &BlobId,
    ) -> HistoryResult<RenderedVersion> {
        self.gate.authorize(Operation::ViewVersion, ctx)?;
        let guard = self.catalog.lock(&ctx.site).await?;
        let entry = guard.ledger.find(blob_id)?.clone();
        let content = self.store.fetch(blob_id).await?;
        drop(guard);

        let render = RenderContext::historical(ctx.site.clone(), *blob_id);
        let html = self.renderer.render(&content, &render);
        debug!(site = %ctx.site, blob = %blob_id, "rendered version");
        Ok(RenderedVersion { entry, html })
    }

    /// Open one historical version as a streamed attachment.
    pub async fn download_version(
        &self,
        ctx: &AccessContext,
        blob_id: &BlobId,
    ) -> HistoryResult<VersionDownload> {
        self.gate.authorize(Operation::DownloadVersion, ctx)?;
        let guard = self.catalog.lock(&ctx.site).await?;
        let entry = guard.ledger.find(blob_id)?.clone();
        let stream = self.store.open(blob_id).await?;
        drop(guard);

        debug!(site = %ctx.site, blob = %blob_id, size = entry.size, "streaming version");
        Ok(VersionDownload {
            filename: self.config.download_filename(&ctx.site),
            content_type: self.config.download_content_type.clone(),
            size: entry.size,
            entry,
            stream,
        })
    }

    /// Save an old version's content forward as the site's new content.
    ///
    /// This is a normal save: it appends a fresh version and may evict.
    pub async fn restore_version(
        &self,
        ctx: &AccessContext,
        blob_id: &BlobId,
    ) -> HistoryResult<RestoreOutcome> {
        self.gate.authorize(Operation::RestoreVersion, ctx)?;
        let mut guard = self.catalog.lock(&ctx.site).await?;
        guard.ledger.find(blob_id)?;

        let content = self.store.fetch(blob_id).await?;
        let saved = self
            .save_locked(&mut guard, content, SaveKind::Restore)
            .await?;

        info!(site = %ctx.site, from = %blob_id, to = %saved.entry.blob_id, "restored version");
        Ok(RestoreOutcome {
            restored_from: *blob_id,
            saved,
        })
    }

    /// Permanently delete one historical version.
    ///
    /// The blob is purged first, so a failed or timed-out purge leaves the
    /// version listed and retrievable. Once the purge succeeds the entry is
    /// removed even if the site record cannot be written; that write is
    /// retried by [`Self::sweep_orphans`].
    pub async fn discard_version(
        &self,
        ctx: &AccessContext,
        blob_id: &BlobId,
    ) -> HistoryResult<DiscardOutcome> {
        self.gate.authorize(Operation::DiscardVersion, ctx)?;
        let mut guard = self.catalog.lock(&ctx.site).await?;
        guard.ledger.find(blob_id)?;
        if guard.is_current(blob_id) {
            return Err(HistoryError::CurrentVersionProtected(*blob_id));
        }

        if let Err(e) = self.purger.purge(blob_id).await {
            warn!(site = %ctx.site, blob = %blob_id, error = %e, "discard purge failed");
            return Err(e.into());
        }

        let (removed, unpersisted) = self
            .catalog
            .commit(&mut guard, |record| record.ledger.remove(blob_id))
            .await?;
        if let Some(e) = &unpersisted {
            warn!(
                site = %ctx.site,
                blob = %blob_id,
                error = %e,
                "version discarded but site record not yet persisted"
            );
        }

        info!(site = %ctx.site, blob = %blob_id, caller = ctx.caller_name(), "discarded version");
        Ok(DiscardOutcome {
            site: ctx.site.clone(),
            removed,
            saved_version_count: guard.saved_version_count(),
            persisted: unpersisted.is_none(),
        })
    }

    // -----------------------------------------------------------------------
    // Orphans
    // -----------------------------------------------------------------------

    /// Blobs whose eviction purge failed and is still pending.
    pub fn pending_orphans(&self) -> Vec<BlobId> {
        self.orphans.snapshot()
    }

    /// Retry every queued orphan purge once, then write any site record
    /// whose last change could not be persisted.
    pub async fn sweep_orphans(&self) -> SweepReport {
        let mut report = SweepReport::default();
        for blob_id in self.orphans.snapshot() {
            match self.purger.purge(&blob_id).await {
                Ok(()) => {
                    self.orphans.remove(&blob_id);
                    report.purged.push(blob_id);
                }
                Err(e) => {
                    debug!(blob = %blob_id, error = %e, "orphan still unpurgeable");
                    report.remaining.push(blob_id);
                }
            }
        }
        report.unpersisted = self.catalog.flush_dirty().await;
        if !report.purged.is_empty()
            || !report.remaining.is_empty()
            || !report.unpersisted.is_empty()
        {
            info!(
                purged = report.purged.len(),
                remaining = report.remaining.len(),
                unpersisted = report.unpersisted.len(),
                "swept orphans"
            );
        }
        report
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    async fn store_version(&self, content: Bytes, kind: SaveKind) -> HistoryResult<NewVersion> {
        let size = content.len() as u64;
        let blob_id = self.store.store(content).await?;
        Ok(NewVersion::new(blob_id, Utc::now(), size, kind))
    }

    /// Best-effort purge of blobs the site no longer references. The
    /// current blob and anything still in the ledger are skipped.
    async fn release(&self, site: &SiteRecord, blobs: Vec<BlobId>) -> PurgeReport {
        let mut report = PurgeReport::default();
        for blob_id in blobs {
            if site.is_current(&blob_id) || site.ledger.contains(&blob_id) {
                continue;
            }
            match self.purger.purge(&blob_id).await {
                Ok(()) => report.purged.push(blob_id),
                Err(e) => {
                    warn!(site = %site.id, blob = %blob_id, error = %e, "purge failed, queued as orphan");
                    self.orphans.push(blob_id);
                    report.orphaned.push(blob_id);
                }
            }
        }
        report
    }

    /// Purge a blob that was stored but never linked into a ledger.
    async fn release_unlinked(&self, site: &SiteId, blob_id: BlobId) {
        if let Err(e) = self.purger.purge(&blob_id).await {
            warn!(%site, blob = %blob_id, error = %e, "unlinked blob purge failed, queued as orphan");
            self.orphans.push(blob_id);
        }
    }
}

impl std::fmt::Debug for SiteHistoryService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SiteHistoryService")
            .field("catalog", &self.catalog)
            .field("gate", &self.gate)
            .field("orphans", &self.orphans.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
