use std::fmt;

use serde::{Deserialize, Serialize};
use verso_types::Capability;

/// A caller-facing history operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    History,
    ViewVersion,
    DownloadVersion,
    RestoreVersion,
    DiscardVersion,
}

impl Operation {
    pub const ALL: [Operation; 5] = [
        Operation::History,
        Operation::ViewVersion,
        Operation::DownloadVersion,
        Operation::RestoreVersion,
        Operation::DiscardVersion,
    ];

    /// Capabilities that each, on their own, permit the operation.
    pub fn accepted_capabilities(&self) -> &'static [Capability] {
        match self {
            Self::History => &[Capability::SiteHistory, Capability::SiteHistoryPreview],
            _ => &[Capability::SiteHistory],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::History => "history",
            Self::ViewVersion => "view_version",
            Self::DownloadVersion => "download_version",
            Self::RestoreVersion => "restore_version",
            Self::DiscardVersion => "discard_version",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How much of the history an authorized caller may see.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessLevel {
    /// Listing plus every per-version operation.
    Full,
    /// Listing only.
    Preview,
}

impl AccessLevel {
    pub fn is_full(&self) -> bool {
        matches!(self, Self::Full)
    }
}

impl fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full => f.write_str("full"),
            Self::Preview => f.write_str("preview"),
        }
    }
}
