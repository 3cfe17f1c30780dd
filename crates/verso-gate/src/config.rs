use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use verso_types::{Capability, CapabilitySet, SiteId};

/// Capability flag configuration.
///
/// Flags are resolved per site: the `sites` entry for a site, if any, is
/// laid over `defaults`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// When `true`, every operation is authorized with full access.
    pub permissive: bool,
    /// Flags applied to every site.
    pub defaults: CapabilitySet,
    /// Per-site overrides.
    pub sites: BTreeMap<SiteId, CapabilitySet>,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            permissive: false,
            defaults: CapabilitySet::none().with(Capability::SiteHistory, true),
            sites: BTreeMap::new(),
        }
    }
}

impl GateConfig {
    /// Authorize everything, for single-user local hosting.
    pub fn permissive() -> Self {
        Self {
            permissive: true,
            ..Default::default()
        }
    }

    /// Nothing enabled anywhere unless overridden per site.
    pub fn locked() -> Self {
        Self {
            permissive: false,
            defaults: CapabilitySet::none(),
            sites: BTreeMap::new(),
        }
    }

    pub fn with_site(mut self, site: SiteId, flags: CapabilitySet) -> Self {
        self.sites.insert(site, flags);
        self
    }

    /// The effective flags for `site`.
    pub fn resolve(&self, site: &SiteId) -> CapabilitySet {
        match self.sites.get(site) {
            Some(overrides) => self.defaults.clone().merged(overrides),
            None => self.defaults.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site(name: &str) -> SiteId {
        SiteId::new(name).unwrap()
    }

    #[test]
    fn default_enables_full_history() {
        let config = GateConfig::default();
        let flags = config.resolve(&site("notes"));
        assert!(flags.is_enabled(Capability::SiteHistory));
        assert!(!flags.is_enabled(Capability::SiteHistoryPreview));
    }

    #[test]
    fn site_override_is_layered_over_defaults() {
        let config = GateConfig::default().with_site(
            site("draft"),
            CapabilitySet::none()
                .with(Capability::SiteHistory, false)
                .with(Capability::SiteHistoryPreview, true),
        );
        let draft = config.resolve(&site("draft"));
        assert!(!draft.is_enabled(Capability::SiteHistory));
        assert!(draft.is_enabled(Capability::SiteHistoryPreview));

        let other = config.resolve(&site("other"));
        assert!(other.is_enabled(Capability::SiteHistory));
    }

    #[test]
    fn parses_from_toml() {
        let raw = r#"
            permissive = false

            [defaults]
            site_history = false
            site_history_preview = true

            [sites.handbook]
            site_history = true
        "#;
        let config: GateConfig = toml::from_str(raw).unwrap();
        assert!(!config.permissive);
        assert!(config.resolve(&site("handbook")).is_enabled(Capability::SiteHistory));
        assert!(!config.resolve(&site("notes")).is_enabled(Capability::SiteHistory));
    }

    #[test]
    fn missing_fields_use_defaults() {
        let config: GateConfig = toml::from_str("").unwrap();
        assert_eq!(config, GateConfig::default());
    }

    #[test]
    fn invalid_site_name_is_rejected() {
        let raw = r#"
            [sites."Not A Site"]
            site_history = true
        "#;
        assert!(toml::from_str::<GateConfig>(raw).is_err());
    }
}
