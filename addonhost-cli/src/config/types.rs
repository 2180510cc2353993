use addonhost_core::AddonHostConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration as stored in TOML files (with optional fields for merging)
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawHostFileConfig {
    #[serde(default)]
    pub addons: RawAddonsConfig,

    #[serde(default)]
    pub services: RawServicesConfig,
}

/// `[addons]` as stored in TOML (optional fields for proper merging)
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawAddonsConfig {
    /// Directory scanned for artifacts
    pub addons_dir: Option<PathBuf>,

    /// Root of per-addon data folders
    pub data_dir: Option<PathBuf>,

    /// Manifest file name inside each artifact
    pub manifest_file: Option<String>,

    /// Create the addons directory when missing
    pub create_addons_dir: Option<bool>,

    /// Disable dependents before their dependency
    pub cascade_disable: Option<bool>,

    /// Slow-hook warning threshold in milliseconds (0 disables)
    pub slow_hook_warning_ms: Option<u64>,
}

/// `[services]` as stored in TOML
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawServicesConfig {
    /// Host services available at startup
    pub enabled: Option<Vec<String>>,
}

/// Final configuration with defaults applied
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct HostFileConfig {
    #[serde(default)]
    pub addons: AddonHostConfig,

    #[serde(default)]
    pub services: ServicesConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ServicesConfig {
    /// Host services available at startup
    #[serde(default)]
    pub enabled: Vec<String>,
}
