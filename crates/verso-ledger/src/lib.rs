//! Version history for verso sites.
//!
//! This crate provides:
//! - [`VersionLedger`]: the ordered, deduplicated, keep-count-bounded history
//!   of one site's saved blobs
//! - [`SiteRecord`]: a site's current content pointer, counters, and ledger
//! - [`SiteCatalog`]: all sites, each behind its own async lock so mutations
//!   of one site are serialized
//! - [`SiteJournal`]: optional JSON persistence, one file per site
//!
//! Nothing here touches blob bytes. Evicted and removed entries are handed
//! back to the caller, which decides when to purge their blobs.

pub mod catalog;
pub mod entry;
pub mod error;
pub mod journal;
pub mod ledger;
pub mod site;

pub use catalog::{SiteCatalog, SiteGuard};
pub use entry::{NewVersion, VersionEntry};
pub use error::{LedgerError, LedgerResult};
pub use journal::SiteJournal;
pub use ledger::{AppendOutcome, VersionLedger};
pub use site::SiteRecord;
