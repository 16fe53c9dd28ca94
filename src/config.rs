//! Adapter configuration.
//!
//! Supports YAML file loading with environment variable overrides for the
//! file location and log filter.

use std::path::Path;

use serde::Deserialize;
use tracing_subscriber::EnvFilter;

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "topomirror.yaml";
/// Environment variable for the configuration file path.
pub const CONFIG_ENV_VAR: &str = "TOPOMIRROR_CONFIG";
/// Environment variable for the log filter.
pub const LOG_ENV_VAR: &str = "TOPOMIRROR_LOG";

/// Result type for configuration loading.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors from configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// Adapter identity and policy configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AdapterConfig {
    /// Automation product reported in the domain record.
    pub automation_product: String,
    /// Name this adapter reports for itself.
    pub adapter_product: String,
    /// Version this adapter reports for itself.
    pub adapter_version: String,
    /// Where the adapter runs; empty means unspecified.
    pub adapter_location: String,
    /// Name of the automation policy descriptor.
    pub policy_name: String,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            automation_product: "www.linux-ha.org".to_string(),
            adapter_product: "topomirror".to_string(),
            adapter_version: "0.1".to_string(),
            adapter_location: String::new(),
            policy_name: "LinuxHA Policy".to_string(),
        }
    }
}

impl AdapterConfig {
    /// Parse a configuration from YAML text.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load from the file named by `TOPOMIRROR_CONFIG`, falling back to
    /// `topomirror.yaml`, falling back to defaults when neither exists.
    pub fn load() -> Result<Self> {
        let path = std::env::var(CONFIG_ENV_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        Self::load_from(Path::new(&path))
    }

    /// Load from a specific file; a missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml(&text)
    }
}

/// Install the global tracing subscriber, honoring `TOPOMIRROR_LOG`.
/// Safe to call more than once; later calls are no-ops.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
