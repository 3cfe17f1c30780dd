use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, RwLock};

use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, warn};
use verso_types::SiteId;

use crate::error::{LedgerError, LedgerResult};
use crate::journal::SiteJournal;
use crate::site::SiteRecord;

/// Exclusive access to one site for the duration of an operation.
pub type SiteGuard = OwnedMutexGuard<SiteRecord>;

/// All hosted sites, each behind its own async lock.
///
/// Holding a [`SiteGuard`] serializes every mutation of that site, including
/// the blob store calls made while it is held. Different sites never contend.
/// Changes go through [`SiteCatalog::update`], which persists the new record
/// before it becomes visible, or [`SiteCatalog::commit`] for changes that
/// must become visible even when persisting them fails.
pub struct SiteCatalog {
    sites: RwLock<HashMap<SiteId, Arc<Mutex<SiteRecord>>>>,
    journal: Option<SiteJournal>,
    /// Sites whose in-memory record is newer than their journal file.
    dirty: std::sync::Mutex<BTreeSet<SiteId>>,
}

impl SiteCatalog {
    /// An in-memory catalog with no persistence.
    pub fn new() -> Self {
        Self {
            sites: RwLock::new(HashMap::new()),
            journal: None,
            dirty: std::sync::Mutex::new(BTreeSet::new()),
        }
    }

    /// A catalog backed by `journal`, preloaded with every record in it.
    pub async fn with_journal(journal: SiteJournal) -> LedgerResult<Self> {
        let records = journal.load_all().await?;
        let sites = records
            .into_iter()
            .map(|r| (r.id.clone(), Arc::new(Mutex::new(r))))
            .collect();
        Ok(Self {
            sites: RwLock::new(sites),
            journal: Some(journal),
            dirty: std::sync::Mutex::new(BTreeSet::new()),
        })
    }

    pub fn len(&self) -> usize {
        self.sites.read().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.read().expect("lock poisoned").is_empty()
    }

    pub fn contains(&self, id: &SiteId) -> bool {
        self.sites.read().expect("lock poisoned").contains_key(id)
    }

    /// Sorted list of all site IDs.
    pub fn site_ids(&self) -> Vec<SiteId> {
        let map = self.sites.read().expect("lock poisoned");
        let mut ids: Vec<SiteId> = map.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Register a new site and persist it.
    pub async fn insert(&self, record: SiteRecord) -> LedgerResult<()> {
        let id = record.id.clone();
        let guard = {
            let mut map = self.sites.write().expect("lock poisoned");
            if map.contains_key(&id) {
                return Err(LedgerError::SiteExists(id));
            }
            let cell = Arc::new(Mutex::new(record));
            // Nobody else can see the cell yet, so this cannot fail.
            let guard = cell
                .clone()
                .try_lock_owned()
                .map_err(|e| LedgerError::Journal(format!("new site lock unavailable: {e}")))?;
            map.insert(id.clone(), cell);
            guard
        };

        if let Err(e) = self.persist(&guard).await {
            self.sites.write().expect("lock poisoned").remove(&id);
            return Err(e);
        }
        info!(site = %id, "registered site");
        Ok(())
    }

    /// Wait for exclusive access to a site.
    pub async fn lock(&self, id: &SiteId) -> LedgerResult<SiteGuard> {
        let cell = {
            let map = self.sites.read().expect("lock poisoned");
            map.get(id)
                .cloned()
                .ok_or_else(|| LedgerError::SiteNotFound(id.clone()))?
        };
        Ok(cell.lock_owned().await)
    }

    /// A copy of a site's current record.
    pub async fn snapshot(&self, id: &SiteId) -> LedgerResult<SiteRecord> {
        Ok(self.lock(id).await?.clone())
    }

    /// Apply `change` to a draft of the locked record, persist the draft,
    /// then install it.
    ///
    /// If `change` or persistence fails, the locked record is untouched.
    pub async fn update<T, F>(&self, guard: &mut SiteGuard, change: F) -> LedgerResult<T>
    where
        F: FnOnce(&mut SiteRecord) -> LedgerResult<T> + Send,
    {
        let mut draft = (**guard).clone();
        let value = change(&mut draft)?;
        self.persist(&draft).await?;
        **guard = draft;
        self.mark_clean(&guard.id);
        debug!(site = %guard.id, versions = guard.saved_version_count(), "site updated");
        Ok(value)
    }

    /// Apply `change` to the locked record and install it whether or not it
    /// can be persisted.
    ///
    /// For changes that record something already done outside the catalog,
    /// such as a purged blob. A failed write is returned next to the value
    /// and leaves the site dirty until [`SiteCatalog::flush_dirty`] or a
    /// later update persists it. If `change` fails, nothing changes.
    pub async fn commit<T, F>(
        &self,
        guard: &mut SiteGuard,
        change: F,
    ) -> LedgerResult<(T, Option<LedgerError>)>
    where
        F: FnOnce(&mut SiteRecord) -> LedgerResult<T> + Send,
    {
        let mut draft = (**guard).clone();
        let value = change(&mut draft)?;
        **guard = draft;

        match self.persist(&**guard).await {
            Ok(()) => {
                self.mark_clean(&guard.id);
                debug!(site = %guard.id, versions = guard.saved_version_count(), "site committed");
                Ok((value, None))
            }
            Err(e) => {
                warn!(site = %guard.id, error = %e, "site committed in memory only");
                self.mark_dirty(guard.id.clone());
                Ok((value, Some(e)))
            }
        }
    }

    /// Sites whose latest committed record is not yet persisted.
    pub fn dirty_sites(&self) -> Vec<SiteId> {
        self.dirty.lock().expect("lock poisoned").iter().cloned().collect()
    }

    /// Retry persisting every dirty site. Returns the sites still dirty.
    pub async fn flush_dirty(&self) -> Vec<SiteId> {
        for id in self.dirty_sites() {
            let guard = match self.lock(&id).await {
                Ok(guard) => guard,
                Err(_) => {
                    self.mark_clean(&id);
                    continue;
                }
            };
            match self.persist(&guard).await {
                Ok(()) => {
                    self.mark_clean(&id);
                    info!(site = %id, "persisted dirty site");
                }
                Err(e) => debug!(site = %id, error = %e, "site still unpersisted"),
            }
        }
        self.dirty_sites()
    }

    fn mark_dirty(&self, id: SiteId) {
        self.dirty.lock().expect("lock poisoned").insert(id);
    }

    fn mark_clean(&self, id: &SiteId) {
        self.dirty.lock().expect("lock poisoned").remove(id);
    }

    async fn persist(&self, record: &SiteRecord) -> LedgerResult<()> {
        match &self.journal {
            Some(journal) => journal.write(record).await,
            None => Ok(()),
        }
    }
}

impl Default for SiteCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SiteCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SiteCatalog")
            .field("site_count", &self.len())
            .field("journal", &self.journal.as_ref().map(|j| j.dir().to_path_buf()))
            .finish()
    }
}
