use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use verso_types::{BlobId, SiteId};

use crate::entry::NewVersion;
use crate::error::{LedgerError, LedgerResult};
use crate::ledger::{AppendOutcome, VersionLedger};

/// A hosted site: its live content pointer, counters, and version history.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteRecord {
    pub id: SiteId,
    /// The blob served as the site's live content.
    pub current_blob_id: BlobId,
    /// When the current blob was created.
    pub blob_created_at: DateTime<Utc>,
    /// Number of deliberate saves (autosaves excluded).
    pub save_count: u64,
    pub created_at: DateTime<Utc>,
    pub ledger: VersionLedger,
}

impl SiteRecord {
    /// A new site whose initial content is also its first version.
    pub fn create(
        id: SiteId,
        keep_count: usize,
        initial: NewVersion,
    ) -> LedgerResult<(Self, AppendOutcome)> {
        let mut record = Self {
            id,
            current_blob_id: initial.blob_id,
            blob_created_at: initial.created_at,
            save_count: 0,
            created_at: initial.created_at,
            ledger: VersionLedger::new(keep_count),
        };
        let outcome = record.apply_save(initial)?;
        Ok((record, outcome))
    }

    /// Record a save: append it to history and make it the live content.
    ///
    /// On error nothing changes.
    pub fn apply_save(&mut self, version: NewVersion) -> LedgerResult<AppendOutcome> {
        let counts = version.kind.counts_as_save();
        let outcome = self.ledger.append(version)?;

        self.current_blob_id = outcome.entry.blob_id;
        self.blob_created_at = outcome.entry.created_at;
        if counts {
            self.save_count += 1;
        }
        Ok(outcome)
    }

    pub fn keep_count(&self) -> usize {
        self.ledger.keep_count()
    }

    pub fn saved_version_count(&self) -> usize {
        self.ledger.len()
    }

    pub fn is_current(&self, blob_id: &BlobId) -> bool {
        self.current_blob_id == *blob_id
    }

    /// Short human-readable activity line for listings, e.g.
    /// `"saved 3 times, last saved 2024-05-01 12:00 UTC"`.
    ///
    /// The last-saved part is only shown once the site has been saved.
    pub fn activity_summary(&self) -> String {
        let times = match self.save_count {
            1 => "1 time".to_string(),
            n => format!("{n} times"),
        };
        if self.save_count == 0 {
            return format!("saved {times}");
        }
        format!(
            "saved {times}, last saved {}",
            self.blob_created_at.format("%Y-%m-%d %H:%M UTC")
        )
    }

    /// Check the ledger invariants for a record loaded from outside.
    pub fn validate(&self) -> LedgerResult<()> {
        self.ledger
            .check_invariants()
            .map_err(|reason| LedgerError::IntegrityViolation {
                site: self.id.clone(),
                reason,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use verso_types::SaveKind;

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, minute, 0).unwrap()
    }

    fn site(keep_count: usize) -> SiteRecord {
        let initial = NewVersion::new(BlobId::generate(), at(0), 10, SaveKind::Initial);
        SiteRecord::create(SiteId::new("notes").unwrap(), keep_count, initial)
            .unwrap()
            .0
    }

    #[test]
    fn create_records_initial_version_as_current() {
        let record = site(3);
        assert_eq!(record.saved_version_count(), 1);
        assert_eq!(record.ledger.latest().unwrap().blob_id, record.current_blob_id);
        assert_eq!(record.save_count, 0);
    }

    #[test]
    fn apply_save_repoints_current() {
        let mut record = site(3);
        let id = BlobId::generate();
        record
            .apply_save(NewVersion::new(id, at(5), 20, SaveKind::Manual))
            .unwrap();
        assert!(record.is_current(&id));
        assert_eq!(record.blob_created_at, at(5));
        assert_eq!(record.save_count, 1);
    }

    #[test]
    fn autosaves_do_not_count() {
        let mut record = site(3);
        record
            .apply_save(NewVersion::new(BlobId::generate(), at(1), 20, SaveKind::Autosave))
            .unwrap();
        assert_eq!(record.save_count, 0);
        assert_eq!(record.saved_version_count(), 2);
    }

    #[test]
    fn failed_save_changes_nothing() {
        let mut record = site(3);
        let before = record.clone();
        let dup = NewVersion::new(record.current_blob_id, at(2), 10, SaveKind::Manual);
        assert!(record.apply_save(dup).is_err());
        assert_eq!(record, before);
    }

    #[test]
    fn activity_summary_wording() {
        let mut record = site(3);
        assert_eq!(record.activity_summary(), "saved 0 times");

        record
            .apply_save(NewVersion::new(BlobId::generate(), at(30), 20, SaveKind::Manual))
            .unwrap();
        assert_eq!(
            record.activity_summary(),
            "saved 1 time, last saved 2024-05-01 12:30 UTC"
        );
    }
}
