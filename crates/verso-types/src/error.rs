use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid hex string: {0}")]
    InvalidHex(String),

    #[error("invalid byte length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("invalid blob id: {0}")]
    InvalidBlobId(String),

    #[error("invalid site name {name:?}: {reason}")]
    InvalidSiteName { name: String, reason: String },

    #[error("unknown capability: {0}")]
    UnknownCapability(String),
}
