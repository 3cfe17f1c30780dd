use verso_types::{BlobId, SiteId};

/// Errors produced by ledger operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("version {0} is already in the ledger")]
    DuplicateVersion(BlobId),

    #[error("version {0} not found")]
    VersionNotFound(BlobId),

    #[error("site not found: {0}")]
    SiteNotFound(SiteId),

    #[error("site already exists: {0}")]
    SiteExists(SiteId),

    #[error("integrity violation in {site}: {reason}")]
    IntegrityViolation { site: SiteId, reason: String },

    #[error("journal error: {0}")]
    Journal(String),
}

/// Result alias for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;
