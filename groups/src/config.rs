//! Group manager configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::Path;

use roster_utils::LogFormat;

use crate::error::GroupError;
use crate::keycloak::DEFAULT_SIGNATURE_VALIDITY_MS;

/// Configuration for a [`GroupManager`](crate::GroupManager).
///
/// Can be loaded from a TOML file via [`GroupsConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupsConfig {
    /// Accept details published by other administrators without asking.
    #[serde(default)]
    pub auto_accept_published_details: bool,

    /// Emit `PhotoNeedsDownload` events for photos not in the photo store.
    #[serde(default = "default_true")]
    pub fetch_photos: bool,

    /// Relay blob plaintext is zero-padded to a multiple of this size.
    #[serde(default = "default_blob_padding")]
    pub blob_padding: usize,

    /// Worker threads for batch reconciliation; 0 uses the rayon default.
    #[serde(default)]
    pub max_batch_parallelism: usize,

    /// How long an identity-provider signature stays acceptable.
    #[serde(default = "default_signature_validity_ms")]
    pub signature_validity_ms: u64,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_true() -> bool {
    true
}

fn default_blob_padding() -> usize {
    4096
}

fn default_signature_validity_ms() -> u64 {
    DEFAULT_SIGNATURE_VALIDITY_MS
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl GroupsConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, GroupError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| GroupError::Config(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, GroupError> {
        let config: Self = toml::from_str(s).map_err(|e| GroupError::Config(e.to_string()))?;
        config.check()?;
        Ok(config)
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, GroupError> {
        toml::to_string_pretty(self).map_err(|e| GroupError::Config(e.to_string()))
    }

    pub fn log_format(&self) -> Result<LogFormat, GroupError> {
        self.log_format
            .parse()
            .map_err(|e: roster_utils::LogFormatError| GroupError::Config(e.to_string()))
    }

    fn check(&self) -> Result<(), GroupError> {
        if self.blob_padding == 0 {
            return Err(GroupError::Config("blob_padding must be positive".into()));
        }
        self.log_format()?;
        Ok(())
    }
}

impl Default for GroupsConfig {
    fn default() -> Self {
        Self {
            auto_accept_published_details: false,
            fetch_photos: default_true(),
            blob_padding: default_blob_padding(),
            max_batch_parallelism: 0,
            signature_validity_ms: default_signature_validity_ms(),
            log_format: default_log_format(),
            log_level: default_log_level(),
        }
    }
}
