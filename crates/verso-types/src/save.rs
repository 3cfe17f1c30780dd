use std::fmt;

use serde::{Deserialize, Serialize};

/// Why a version was saved.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveKind {
    /// Content the site was created with.
    Initial,
    /// An explicit save by the site owner.
    Manual,
    /// A periodic save the editor made on its own.
    Autosave,
    /// A whole-file upload replacing the content.
    Upload,
    /// A historical version re-saved as current.
    Restore,
}

impl SaveKind {
    /// Whether this save counts toward a site's save count.
    ///
    /// Creation and autosaves are excluded so the count reflects deliberate
    /// edits only.
    pub fn counts_as_save(&self) -> bool {
        matches!(self, Self::Manual | Self::Upload | Self::Restore)
    }
}

impl fmt::Display for SaveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Initial => "initial",
            Self::Manual => "manual",
            Self::Autosave => "autosave",
            Self::Upload => "upload",
            Self::Restore => "restore",
        };
        f.write_str(name)
    }
}
