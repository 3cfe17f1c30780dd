use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use verso_gate::GateConfig;
use verso_history::HistoryConfig;
use verso_store::StoreConfig;

use crate::error::{ServerError, ServerResult};

/// Default upper bound on a saved document's size.
pub const DEFAULT_MAX_CONTENT_BYTES: usize = 64 * 1024 * 1024;

/// Top-level server configuration, read from TOML.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Directory for site journals. Without one, site state lives only in
    /// memory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_dir: Option<PathBuf>,
    /// Seconds between background orphan sweeps; zero disables them.
    pub orphan_sweep_secs: u64,
    /// Largest request body accepted when creating or saving a site.
    pub max_content_bytes: usize,
    pub store: StoreConfig,
    pub gate: GateConfig,
    pub history: HistoryConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            state_dir: None,
            orphan_sweep_secs: 300,
            max_content_bytes: DEFAULT_MAX_CONTENT_BYTES,
            store: StoreConfig::default(),
            gate: GateConfig::default(),
            history: HistoryConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Read a configuration file.
    pub fn load(path: &Path) -> ServerResult<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ServerError::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_toml(&raw)
    }

    pub fn from_toml(raw: &str) -> ServerResult<Self> {
        toml::from_str(raw).map_err(|e| ServerError::Config(e.to_string()))
    }

    pub fn to_toml(&self) -> ServerResult<String> {
        toml::to_string_pretty(self).map_err(|e| ServerError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use verso_store::StoreBackend;
    use verso_types::{Capability, SiteId};

    #[test]
    fn default_config() {
        let c = ServerConfig::default();
        assert_eq!(c.bind_addr, "127.0.0.1:8080".parse::<SocketAddr>().unwrap());
        assert!(c.state_dir.is_none());
        assert_eq!(c.max_content_bytes, DEFAULT_MAX_CONTENT_BYTES);
        assert_eq!(c.store.backend, StoreBackend::Memory);
        assert_eq!(c.history.default_keep_count, 20);
    }

    #[test]
    fn default_round_trips_through_toml() {
        let text = ServerConfig::default().to_toml().unwrap();
        let parsed = ServerConfig::from_toml(&text).unwrap();
        assert_eq!(parsed.bind_addr, ServerConfig::default().bind_addr);
        assert_eq!(parsed.gate, GateConfig::default());
    }

    #[test]
    fn parses_full_file() {
        let raw = r#"
            bind_addr = "0.0.0.0:9000"
            state_dir = "/var/lib/verso/sites"

            [store]
            timeout_ms = 2500
            backend = { kind = "filesystem", root = "/var/lib/verso/blobs" }

            [gate.defaults]
            site_history_preview = true

            [gate.sites.handbook]
            site_history = true

            [history]
            default_keep_count = 5
        "#;
        let c = ServerConfig::from_toml(raw).unwrap();
        assert_eq!(c.bind_addr.port(), 9000);
        assert_eq!(c.state_dir, Some(PathBuf::from("/var/lib/verso/sites")));
        assert_eq!(c.store.timeout_ms, 2500);
        assert_eq!(
            c.store.backend,
            StoreBackend::Filesystem {
                root: PathBuf::from("/var/lib/verso/blobs")
            }
        );
        let handbook = c.gate.resolve(&SiteId::new("handbook").unwrap());
        assert!(handbook.is_enabled(Capability::SiteHistory));
        assert_eq!(c.history.default_keep_count, 5);
        assert_eq!(c.history.download_extension, "html");
    }

    #[test]
    fn bad_toml_is_a_config_error() {
        let err = ServerConfig::from_toml("bind_addr = 42").unwrap_err();
        assert!(matches!(err, ServerError::Config(_)));
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("verso.toml");
        std::fs::write(&path, "orphan_sweep_secs = 0\n").unwrap();
        assert_eq!(ServerConfig::load(&path).unwrap().orphan_sweep_secs, 0);
        assert!(ServerConfig::load(&dir.path().join("missing.toml")).is_err());
    }
}
