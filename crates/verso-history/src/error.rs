use verso_gate::GateError;
use verso_ledger::LedgerError;
use verso_store::StoreError;
use verso_types::{BlobId, SiteId};

/// Errors surfaced by [`SiteHistoryService`](crate::SiteHistoryService).
#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    /// The caller lacks the capability the operation needs. Nothing was read
    /// or changed.
    #[error("not authorized: {0}")]
    Authorization(#[from] GateError),

    #[error("version {0} not found")]
    VersionNotFound(BlobId),

    /// A freshly stored blob collided with a ledger entry.
    #[error("version {0} is already recorded")]
    DuplicateVersion(BlobId),

    /// The blob store failed or timed out. Ledger state is unchanged.
    #[error("storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("site not found: {0}")]
    SiteNotFound(SiteId),

    #[error("site already exists: {0}")]
    SiteExists(SiteId),

    #[error("version {0} is the site's current content and cannot be discarded")]
    CurrentVersionProtected(BlobId),

    #[error("journal error: {0}")]
    Journal(String),
}

impl HistoryError {
    /// Whether the caller may retry the same request later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage(_))
    }
}

impl From<LedgerError> for HistoryError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::DuplicateVersion(id) => Self::DuplicateVersion(id),
            LedgerError::VersionNotFound(id) => Self::VersionNotFound(id),
            LedgerError::SiteNotFound(site) => Self::SiteNotFound(site),
            LedgerError::SiteExists(site) => Self::SiteExists(site),
            LedgerError::Journal(message) => Self::Journal(message),
            other @ LedgerError::IntegrityViolation { .. } => Self::Journal(other.to_string()),
        }
    }
}

/// Result alias for history operations.
pub type HistoryResult<T> = Result<T, HistoryError>;
