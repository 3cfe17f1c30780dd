use tracing::{debug, warn};
use verso_types::{Capability, CapabilitySet, SiteId};

use crate::config::GateConfig;
use crate::context::AccessContext;
use crate::error::GateError;
use crate::operation::{AccessLevel, Operation};

// ---------------------------------------------------------------------------
// AccessGate
// ---------------------------------------------------------------------------

/// Decides whether a caller may perform a history operation.
///
/// The gate is pure: it never reads a ledger or the blob store, so a denial
/// can be returned before any work begins.
#[derive(Clone, Debug, Default)]
pub struct AccessGate {
    config: GateConfig,
}

impl AccessGate {
    pub fn new(config: GateConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// Resolve the configured flags for `site` into a request context.
    pub fn context_for(&self, site: SiteId) -> AccessContext {
        let capabilities = self.config.resolve(&site);
        AccessContext::new(site, capabilities)
    }

    /// The access level the flags grant, if any.
    pub fn access_level(&self, capabilities: &CapabilitySet) -> Option<AccessLevel> {
        if self.config.permissive || capabilities.is_enabled(Capability::SiteHistory) {
            Some(AccessLevel::Full)
        } else if capabilities.is_enabled(Capability::SiteHistoryPreview) {
            Some(AccessLevel::Preview)
        } else {
            None
        }
    }

    /// Authorize `operation` for the caller described by `context`.
    ///
    /// Listing is allowed with either flag; every per-version operation
    /// requires `site_history`.
    pub fn authorize(
        &self,
        operation: Operation,
        context: &AccessContext,
    ) -> Result<AccessLevel, GateError> {
        let level = self.access_level(&context.capabilities);
        let allowed = match (operation, level) {
            (_, Some(AccessLevel::Full)) => true,
            (Operation::History, Some(AccessLevel::Preview)) => true,
            _ => false,
        };

        match level {
            Some(level) if allowed => {
                debug!(
                    site = %context.site,
                    caller = context.caller_name(),
                    %operation,
                    %level,
                    "access granted"
                );
                Ok(level)
            }
            _ => {
                warn!(
                    site = %context.site,
                    caller = context.caller_name(),
                    %operation,
                    "access denied"
                );
                Err(GateError::Denied {
                    operation,
                    required: operation.accepted_capabilities().to_vec(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(capabilities: CapabilitySet) -> AccessContext {
        AccessContext::new(SiteId::new("notes").unwrap(), capabilities)
    }

    fn preview_only() -> CapabilitySet {
        CapabilitySet::none().with(Capability::SiteHistoryPreview, true)
    }

    // -----------------------------------------------------------------------
    // Full access
    // -----------------------------------------------------------------------

    #[test]
    fn full_capability_allows_everything() {
        let gate = AccessGate::default();
        let context = ctx(CapabilitySet::none().with(Capability::SiteHistory, true));
        for op in Operation::ALL {
            assert_eq!(gate.authorize(op, &context).unwrap(), AccessLevel::Full);
        }
    }

    #[test]
    fn both_flags_grant_full_access() {
        let gate = AccessGate::default();
        let level = gate.authorize(Operation::History, &ctx(CapabilitySet::all()));
        assert_eq!(level.unwrap(), AccessLevel::Full);
    }

    // -----------------------------------------------------------------------
    // Preview access
    // -----------------------------------------------------------------------

    #[test]
    fn preview_allows_listing_only() {
        let gate = AccessGate::default();
        let context = ctx(preview_only());
        assert_eq!(
            gate.authorize(Operation::History, &context).unwrap(),
            AccessLevel::Preview
        );

        for op in Operation::ALL.into_iter().filter(|op| *op != Operation::History) {
            let err = gate.authorize(op, &context).unwrap_err();
            assert_eq!(
                err,
                GateError::Denied {
                    operation: op,
                    required: vec![Capability::SiteHistory],
                }
            );
        }
    }

    #[test]
    fn preview_cannot_restore() {
        let gate = AccessGate::default();
        let err = gate
            .authorize(Operation::RestoreVersion, &ctx(preview_only()).with_caller("ana"))
            .unwrap_err();
        assert!(err.to_string().contains("restore_version"));
    }

    // -----------------------------------------------------------------------
    // No access
    // -----------------------------------------------------------------------

    #[test]
    fn no_flags_denies_listing() {
        let gate = AccessGate::default();
        let err = gate
            .authorize(Operation::History, &ctx(CapabilitySet::none()))
            .unwrap_err();
        assert!(matches!(err, GateError::Denied { operation: Operation::History, .. }));
    }

    #[test]
    fn explicitly_disabled_flags_deny() {
        let gate = AccessGate::default();
        let flags = CapabilitySet::none()
            .with(Capability::SiteHistory, false)
            .with(Capability::SiteHistoryPreview, false);
        assert!(gate.authorize(Operation::ViewVersion, &ctx(flags)).is_err());
    }

    #[test]
    fn permissive_gate_ignores_flags() {
        let gate = AccessGate::new(GateConfig::permissive());
        let context = ctx(CapabilitySet::none());
        assert_eq!(
            gate.authorize(Operation::DiscardVersion, &context).unwrap(),
            AccessLevel::Full
        );
    }

    // -----------------------------------------------------------------------
    // Context resolution
    // -----------------------------------------------------------------------

    #[test]
    fn context_for_uses_site_overrides() {
        let site = SiteId::new("draft").unwrap();
        let gate = AccessGate::new(GateConfig::locked().with_site(site.clone(), preview_only()));

        let context = gate.context_for(site);
        assert_eq!(
            gate.authorize(Operation::History, &context).unwrap(),
            AccessLevel::Preview
        );

        let other = gate.context_for(SiteId::new("other").unwrap());
        assert!(gate.authorize(Operation::History, &other).is_err());
    }
}
