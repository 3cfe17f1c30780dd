//! Site history for verso.
//!
//! [`SiteHistoryService`] is the single entry point for everything that
//! reads or changes a site's saved versions:
//!
//! - `history` -- current content pointer, counters, and the version list
//! - `view_version` / `download_version` -- read one historical version
//! - `restore_version` -- save an old version forward as the new content
//! - `discard_version` -- purge one historical version for good
//! - `create_site`, `save`, `set_keep_count`, `sweep_orphans`
//!
//! Per-version operations are authorized by the
//! [`AccessGate`](verso_gate::AccessGate) before any ledger or blob store
//! work starts. All mutations of one site are serialized by its
//! [`SiteCatalog`](verso_ledger::SiteCatalog) lock.

pub mod config;
pub mod error;
pub mod outcome;
pub mod purge;
pub mod render;
pub mod service;

pub use config::HistoryConfig;
pub use error::{HistoryError, HistoryResult};
pub use outcome::{
    DiscardOutcome, HistorySummary, KeepCountOutcome, PurgeReport, RenderedVersion,
    RestoreOutcome, SaveOutcome, SweepReport, VersionDownload,
};
pub use purge::{ForegroundPurger, OrphanQueue, Purger};
pub use render::{ContentRenderer, HtmlPassthrough, RenderContext};
pub use service::SiteHistoryService;
