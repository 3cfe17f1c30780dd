use serde::{Deserialize, Serialize};
use verso_types::SiteId;

/// History service settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Keep-count for sites created without an explicit one.
    pub default_keep_count: usize,
    /// `Content-Type` sent with downloaded versions.
    pub download_content_type: String,
    /// Extension appended to the site name to form the download file name.
    pub download_extension: String,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            default_keep_count: 20,
            download_content_type: "text/html; charset=utf-8".to_string(),
            download_extension: "html".to_string(),
        }
    }
}

impl HistoryConfig {
    /// Attachment name for a downloaded version of `site`.
    pub fn download_filename(&self, site: &SiteId) -> String {
        if self.download_extension.is_empty() {
            site.to_string()
        } else {
            format!("{site}.{}", self.download_extension)
        }
    }
}
