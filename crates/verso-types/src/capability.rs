use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// A named feature flag that gates access to site history.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Full history: listing plus view, download, restore, and discard.
    SiteHistory,
    /// Restricted grant: history listing only.
    SiteHistoryPreview,
}

impl Capability {
    pub const ALL: [Capability; 2] = [Capability::SiteHistory, Capability::SiteHistoryPreview];

    /// The flag name as it appears in configuration.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SiteHistory => "site_history",
            Self::SiteHistoryPreview => "site_history_preview",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Capability {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|cap| cap.as_str() == s)
            .ok_or_else(|| TypeError::UnknownCapability(s.to_string()))
    }
}

/// Capability flags resolved for one caller and one site.
///
/// Built once per request and passed down; nothing below the request
/// boundary looks flags up on its own. Missing entries read as disabled.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapabilitySet(BTreeMap<Capability, bool>);

impl CapabilitySet {
    /// A set with every capability disabled.
    pub fn none() -> Self {
        Self::default()
    }

    /// A set with every capability enabled.
    pub fn all() -> Self {
        Capability::ALL.into_iter().collect()
    }

    /// Builder-style setter.
    pub fn with(mut self, capability: Capability, enabled: bool) -> Self {
        self.set(capability, enabled);
        self
    }

    pub fn set(&mut self, capability: Capability, enabled: bool) {
        self.0.insert(capability, enabled);
    }

    /// Returns `true` if the capability is present and enabled.
    pub fn is_enabled(&self, capability: Capability) -> bool {
        self.0.get(&capability).copied().unwrap_or(false)
    }

    /// Overlay `other` on top of `self`; entries in `other` win.
    pub fn merged(mut self, other: &CapabilitySet) -> Self {
        for (cap, enabled) in &other.0 {
            self.0.insert(*cap, *enabled);
        }
        self
    }

    /// Enabled capabilities in flag order.
    pub fn enabled(&self) -> impl Iterator<Item = Capability> + '_ {
        self.0.iter().filter(|(_, on)| **on).map(|(cap, _)| *cap)
    }
}

impl FromIterator<Capability> for CapabilitySet {
    fn from_iter<T: IntoIterator<Item = Capability>>(iter: T) -> Self {
        Self(iter.into_iter().map(|cap| (cap, true)).collect())
    }
}
