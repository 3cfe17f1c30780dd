use std::collections::{HashSet, VecDeque};

use serde::{Deserialize, Serialize};
use tracing::debug;
use verso_types::BlobId;

use crate::entry::{NewVersion, VersionEntry};
use crate::error::{LedgerError, LedgerResult};

/// Result of appending a version.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppendOutcome {
    /// The entry as recorded, with its sequence number.
    pub entry: VersionEntry,
    /// Entries pushed out by the keep-count bound, oldest first. Their blobs
    /// are now eligible for purge.
    pub evicted: Vec<VersionEntry>,
}

/// Ordered history of one site's saved blobs.
///
/// Invariants, checked by [`VersionLedger::check_invariants`]:
/// - entries are in ascending `seq` order (oldest first internally)
/// - no blob ID appears twice
/// - `len() <= keep_count()` after every append
///
/// Eviction is strictly FIFO: when the bound is exceeded the oldest entries
/// go first, since history is mostly used to undo recent changes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionLedger {
    keep_count: usize,
    next_seq: u64,
    entries: VecDeque<VersionEntry>,
}

impl VersionLedger {
    /// Create an empty ledger retaining at most `keep_count` versions.
    pub fn new(keep_count: usize) -> Self {
        Self {
            keep_count,
            next_seq: 1,
            entries: VecDeque::new(),
        }
    }

    pub fn keep_count(&self) -> usize {
        self.keep_count
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Record a new version, evicting the oldest entries beyond keep-count.
    ///
    /// Fails with [`LedgerError::DuplicateVersion`] if the blob is already
    /// recorded; the ledger is unchanged in that case.
    pub fn append(&mut self, version: NewVersion) -> LedgerResult<AppendOutcome> {
        if self.contains(&version.blob_id) {
            return Err(LedgerError::DuplicateVersion(version.blob_id));
        }

        let entry = version.into_entry(self.next_seq);
        self.next_seq += 1;
        self.entries.push_back(entry.clone());
        let evicted = self.evict_to(self.keep_count);

        debug!(
            blob = %entry.blob_id,
            seq = entry.seq,
            evicted = evicted.len(),
            "appended version"
        );
        Ok(AppendOutcome { entry, evicted })
    }

    /// Versions newest-first, the order used for display.
    pub fn list(&self) -> impl DoubleEndedIterator<Item = &VersionEntry> + ExactSizeIterator + '_ {
        self.entries.iter().rev()
    }

    /// Versions oldest-first.
    pub fn oldest_first(&self) -> impl DoubleEndedIterator<Item = &VersionEntry> + ExactSizeIterator + '_ {
        self.entries.iter()
    }

    /// The most recently appended version still retained.
    pub fn latest(&self) -> Option<&VersionEntry> {
        self.entries.back()
    }

    pub fn contains(&self, blob_id: &BlobId) -> bool {
        self.entries.iter().any(|e| e.blob_id == *blob_id)
    }

    /// Look up a version by blob ID.
    pub fn find(&self, blob_id: &BlobId) -> LedgerResult<&VersionEntry> {
        self.entries
            .iter()
            .find(|e| e.blob_id == *blob_id)
            .ok_or(LedgerError::VersionNotFound(*blob_id))
    }

    /// Remove a version and return it.
    ///
    /// The blob itself is untouched; purging it is the caller's job.
    pub fn remove(&mut self, blob_id: &BlobId) -> LedgerResult<VersionEntry> {
        let index = self
            .entries
            .iter()
            .position(|e| e.blob_id == *blob_id)
            .ok_or(LedgerError::VersionNotFound(*blob_id))?;
        self.entries
            .remove(index)
            .ok_or(LedgerError::VersionNotFound(*blob_id))
    }

    /// Change the retention bound, returning any entries evicted by a
    /// smaller bound (oldest first).
    pub fn set_keep_count(&mut self, keep_count: usize) -> Vec<VersionEntry> {
        self.keep_count = keep_count;
        self.evict_to(keep_count)
    }

    fn evict_to(&mut self, bound: usize) -> Vec<VersionEntry> {
        let excess = self.entries.len().saturating_sub(bound);
        self.entries.drain(..excess).collect()
    }

    /// Verify ordering, uniqueness, and the keep-count bound.
    ///
    /// Used when loading a ledger from outside the process.
    pub fn check_invariants(&self) -> Result<(), String> {
        if self.entries.len() > self.keep_count {
            return Err(format!(
                "{} entries exceed keep-count {}",
                self.entries.len(),
                self.keep_count
            ));
        }

        let mut seen = HashSet::new();
        let mut prev_seq = 0;
        for entry in &self.entries {
            if !seen.insert(entry.blob_id) {
                return Err(format!("duplicate blob {}", entry.blob_id));
            }
            if entry.seq <= prev_seq {
                return Err(format!("seq {} does not follow {prev_seq}", entry.seq));
            }
            prev_seq = entry.seq;
        }

        if prev_seq >= self.next_seq {
            return Err(format!(
                "next seq {} is not past last seq {prev_seq}",
                self.next_seq
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use proptest::prelude::*;
    use verso_types::SaveKind;

    fn version(blob_id: BlobId, minute: u32) -> NewVersion {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, minute, 0).unwrap();
        NewVersion::new(blob_id, at, 100 + minute as u64, SaveKind::Manual)
    }

    fn ids(n: usize) -> Vec<BlobId> {
        (0..n).map(|_| BlobId::generate()).collect()
    }

    fn blob_ids<'a>(entries: impl Iterator<Item = &'a VersionEntry>) -> Vec<BlobId> {
        entries.map(|e| e.blob_id).collect()
    }

    // -----------------------------------------------------------------------
    // Append and eviction
    // -----------------------------------------------------------------------

    #[test]
    fn append_within_bound_evicts_nothing() {
        let mut ledger = VersionLedger::new(3);
        let v = ids(2);
        for (i, id) in v.iter().enumerate() {
            let outcome = ledger.append(version(*id, i as u32)).unwrap();
            assert!(outcome.evicted.is_empty());
        }
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn append_beyond_keep_count_evicts_oldest() {
        let mut ledger = VersionLedger::new(3);
        let v = ids(4);
        for (i, id) in v[..3].iter().enumerate() {
            ledger.append(version(*id, i as u32)).unwrap();
        }

        let outcome = ledger.append(version(v[3], 3)).unwrap();
        assert_eq!(blob_ids(outcome.evicted.iter()), vec![v[0]]);
        assert_eq!(blob_ids(ledger.oldest_first()), vec![v[1], v[2], v[3]]);
    }

    #[test]
    fn sequence_numbers_increase_and_are_not_reused() {
        let mut ledger = VersionLedger::new(5);
        let v = ids(3);
        let first = ledger.append(version(v[0], 0)).unwrap().entry;
        ledger.remove(&v[0]).unwrap();
        let second = ledger.append(version(v[1], 1)).unwrap().entry;
        assert_eq!(first.seq, 1);
        assert_eq!(second.seq, 2);
    }

    #[test]
    fn duplicate_append_is_rejected_without_change() {
        let mut ledger = VersionLedger::new(3);
        let id = BlobId::generate();
        ledger.append(version(id, 0)).unwrap();
        let before = ledger.clone();

        let err = ledger.append(version(id, 1)).unwrap_err();
        assert_eq!(err, LedgerError::DuplicateVersion(id));
        assert_eq!(ledger, before);
    }

    #[test]
    fn keep_count_zero_retains_nothing() {
        let mut ledger = VersionLedger::new(0);
        let id = BlobId::generate();
        let outcome = ledger.append(version(id, 0)).unwrap();
        assert_eq!(blob_ids(outcome.evicted.iter()), vec![id]);
        assert!(ledger.is_empty());
    }

    // -----------------------------------------------------------------------
    // Listing, lookup, removal
    // -----------------------------------------------------------------------

    #[test]
    fn list_is_newest_first() {
        let mut ledger = VersionLedger::new(5);
        let v = ids(3);
        for (i, id) in v.iter().enumerate() {
            ledger.append(version(*id, i as u32)).unwrap();
        }
        assert_eq!(blob_ids(ledger.list()), vec![v[2], v[1], v[0]]);
        assert_eq!(ledger.latest().unwrap().blob_id, v[2]);
    }

    #[test]
    fn find_returns_recorded_attributes() {
        let mut ledger = VersionLedger::new(3);
        let id = BlobId::generate();
        let recorded = ledger.append(version(id, 7)).unwrap().entry;

        let found = ledger.find(&id).unwrap();
        assert_eq!(found, &recorded);
        assert_eq!(found.size, 107);
    }

    #[test]
    fn find_missing_is_version_not_found() {
        let ledger = VersionLedger::new(3);
        let id = BlobId::generate();
        assert_eq!(ledger.find(&id).unwrap_err(), LedgerError::VersionNotFound(id));
    }

    #[test]
    fn remove_then_find_fails() {
        let mut ledger = VersionLedger::new(3);
        let v = ids(3);
        for (i, id) in v.iter().enumerate() {
            ledger.append(version(*id, i as u32)).unwrap();
        }

        let removed = ledger.remove(&v[1]).unwrap();
        assert_eq!(removed.blob_id, v[1]);
        assert_eq!(ledger.find(&v[1]).unwrap_err(), LedgerError::VersionNotFound(v[1]));
        assert_eq!(blob_ids(ledger.oldest_first()), vec![v[0], v[2]]);
    }

    #[test]
    fn remove_missing_fails() {
        let mut ledger = VersionLedger::new(3);
        let id = BlobId::generate();
        assert_eq!(ledger.remove(&id).unwrap_err(), LedgerError::VersionNotFound(id));
    }

    // -----------------------------------------------------------------------
    // Keep-count changes
    // -----------------------------------------------------------------------

    #[test]
    fn shrinking_keep_count_evicts_oldest() {
        let mut ledger = VersionLedger::new(5);
        let v = ids(4);
        for (i, id) in v.iter().enumerate() {
            ledger.append(version(*id, i as u32)).unwrap();
        }

        let evicted = ledger.set_keep_count(2);
        assert_eq!(blob_ids(evicted.iter()), vec![v[0], v[1]]);
        assert_eq!(blob_ids(ledger.oldest_first()), vec![v[2], v[3]]);
        assert!(ledger.set_keep_count(10).is_empty());
    }

    // -----------------------------------------------------------------------
    // Invariant checking
    // -----------------------------------------------------------------------

    #[test]
    fn check_invariants_detects_duplicates() {
        let mut ledger = VersionLedger::new(3);
        let id = BlobId::generate();
        ledger.append(version(id, 0)).unwrap();
        let copy = ledger.entries[0].clone();
        ledger.entries.push_back(VersionEntry { seq: 2, ..copy });
        ledger.next_seq = 3;

        let reason = ledger.check_invariants().unwrap_err();
        assert!(reason.contains("duplicate"));
    }

    #[test]
    fn check_invariants_detects_overflow() {
        let mut ledger = VersionLedger::new(3);
        for (i, id) in ids(3).into_iter().enumerate() {
            ledger.append(version(id, i as u32)).unwrap();
        }
        ledger.keep_count = 1;
        assert!(ledger.check_invariants().is_err());
    }

    #[test]
    fn serde_preserves_next_seq() {
        let mut ledger = VersionLedger::new(2);
        for (i, id) in ids(3).into_iter().enumerate() {
            ledger.append(version(id, i as u32)).unwrap();
        }
        let json = serde_json::to_string(&ledger).unwrap();
        let mut decoded: VersionLedger = serde_json::from_str(&json).unwrap();
        decoded.check_invariants().unwrap();
        let next = decoded.append(version(BlobId::generate(), 9)).unwrap();
        assert_eq!(next.entry.seq, 4);
    }

    // -----------------------------------------------------------------------
    // Properties
    // -----------------------------------------------------------------------

    proptest! {
        #[test]
        fn length_never_exceeds_keep_count(keep in 0usize..8, appends in 0usize..40) {
            let mut ledger = VersionLedger::new(keep);
            for i in 0..appends {
                ledger.append(version(BlobId::generate(), (i % 60) as u32)).unwrap();
                prop_assert!(ledger.len() <= keep);
            }
            prop_assert!(ledger.check_invariants().is_ok());
        }

        #[test]
        fn survivors_are_the_most_recent(keep in 1usize..8, appends in 1usize..40) {
            let mut ledger = VersionLedger::new(keep);
            let all = ids(appends);
            let mut evicted = Vec::new();
            for (i, id) in all.iter().enumerate() {
                let outcome = ledger.append(version(*id, (i % 60) as u32)).unwrap();
                evicted.extend(outcome.evicted.into_iter().map(|e| e.blob_id));
            }

            let start = appends.saturating_sub(keep);
            prop_assert_eq!(blob_ids(ledger.oldest_first()), all[start..].to_vec());
            prop_assert_eq!(evicted, all[..start].to_vec());
        }
    }
}
