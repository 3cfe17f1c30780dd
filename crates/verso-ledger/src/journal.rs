//! JSON persistence for site records, one file per site.
//!
//! Each write goes to `<site>.json.tmp` and is renamed over `<site>.json`,
//! so a reader never sees a half-written record.

use std::path::{Path, PathBuf};

use tracing::{debug, info};
use verso_types::SiteId;

use crate::error::{LedgerError, LedgerResult};
use crate::site::SiteRecord;

/// Directory of `<site>.json` records.
#[derive(Clone, Debug)]
pub struct SiteJournal {
    dir: PathBuf,
}

fn journal_err(context: &str, path: &Path, err: impl std::fmt::Display) -> LedgerError {
    LedgerError::Journal(format!("{context} {}: {err}", path.display()))
}

impl SiteJournal {
    /// Open (creating if needed) a journal directory.
    pub async fn open(dir: impl Into<PathBuf>) -> LedgerResult<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| journal_err("cannot create", &dir, e))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, id: &SiteId) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    /// Atomically replace the stored record for `record.id`.
    pub async fn write(&self, record: &SiteRecord) -> LedgerResult<()> {
        let path = self.path_for(&record.id);
        let tmp = self.dir.join(format!("{}.json.tmp", record.id));
        let encoded = serde_json::to_vec_pretty(record)
            .map_err(|e| LedgerError::Journal(format!("cannot encode {}: {e}", record.id)))?;

        tokio::fs::write(&tmp, &encoded)
            .await
            .map_err(|e| journal_err("cannot write", &tmp, e))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| journal_err("cannot replace", &path, e))?;

        debug!(site = %record.id, versions = record.saved_version_count(), "journaled site");
        Ok(())
    }

    /// Load and validate every record in the directory.
    pub async fn load_all(&self) -> LedgerResult<Vec<SiteRecord>> {
        let mut dir = tokio::fs::read_dir(&self.dir)
            .await
            .map_err(|e| journal_err("cannot read", &self.dir, e))?;

        let mut records = Vec::new();
        while let Some(item) = dir
            .next_entry()
            .await
            .map_err(|e| journal_err("cannot read", &self.dir, e))?
        {
            let path = item.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }

            let raw = tokio::fs::read(&path)
                .await
                .map_err(|e| journal_err("cannot read", &path, e))?;
            let record: SiteRecord =
                serde_json::from_slice(&raw).map_err(|e| journal_err("cannot decode", &path, e))?;

            if path.file_stem().and_then(|s| s.to_str()) != Some(record.id.as_str()) {
                return Err(journal_err(
                    "site id does not match file name in",
                    &path,
                    &record.id,
                ));
            }
            record.validate()?;
            records.push(record);
        }

        records.sort_by(|a, b| a.id.cmp(&b.id));
        info!(dir = %self.dir.display(), sites = records.len(), "loaded site journal");
        Ok(records)
    }
}
