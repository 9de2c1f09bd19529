use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

use crate::core::Result;
use crate::error::StorageError;

/// Provider settings shared by `BlobFS` and `DirFS`.
///
/// Can be loaded from TOML; every key is optional:
///
/// ```toml
/// default_sas_ttl_secs = 3600
/// copy_buffer_size = 8192
/// default_content_type = "application/unknown"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Lifetime of a shared-access URL when the caller gives no explicit expiration.
    pub default_sas_ttl_secs: u64,
    /// Chunk size used by `save_stream`.
    pub copy_buffer_size: usize,
    /// Content type stored when the file extension is unknown.
    pub default_content_type: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            default_sas_ttl_secs: 3600,
            copy_buffer_size: 8192,
            default_content_type: "application/unknown".to_string(),
        }
    }
}

impl ProviderConfig {
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self = toml::from_str(source).map_err(anyhow::Error::from)?;
        if config.copy_buffer_size == 0 {
            return Err(StorageError::InvalidArgument(
                "copy_buffer_size must be greater than zero".to_string(),
            ));
        }
        Ok(config)
    }

    /// Expiration applied to a shared-access URL requested without one.
    pub fn default_expiration(&self) -> DateTime<Utc> {
        let ttl = i64::try_from(self.default_sas_ttl_secs).unwrap_or(i64::MAX);
        Duration::try_seconds(ttl)
            .and_then(|ttl| Utc::now().checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    pub(crate) fn content_type_for(&self, path: &str) -> String {
        crate::core::utils::content_type(path)
            .map(str::to_string)
            .unwrap_or_else(|| self.default_content_type.clone())
    }
}
