use serde::{Deserialize, Serialize};
use verso_types::{CapabilitySet, SiteId};

/// Everything the gate knows about one request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessContext {
    pub site: SiteId,
    pub capabilities: CapabilitySet,
    /// Caller name for logs; anonymous callers have none.
    pub caller: Option<String>,
}

impl AccessContext {
    pub fn new(site: SiteId, capabilities: CapabilitySet) -> Self {
        Self {
            site,
            capabilities,
            caller: None,
        }
    }

    pub fn with_caller(mut self, caller: impl Into<String>) -> Self {
        self.caller = Some(caller.into());
        self
    }

    /// Caller name, or `"anonymous"`.
    pub fn caller_name(&self) -> &str {
        self.caller.as_deref().unwrap_or("anonymous")
    }
}
