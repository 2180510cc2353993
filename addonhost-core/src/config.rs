//! Extension host configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default manifest resource name inside an artifact
pub const DEFAULT_MANIFEST_FILE: &str = "addon.toml";

/// Default threshold above which a hook call is reported as slow
pub const DEFAULT_SLOW_HOOK_WARNING_MS: u64 = 5000;

/// Configuration for [`crate::AddonManager`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddonHostConfig {
    /// Directory scanned for artifacts (~/.config/addonhost/addons)
    pub addons_dir: PathBuf,
    /// Root of addon data folders (~/.local/share/addonhost)
    pub data_dir: PathBuf,
    /// Manifest resource name inside each artifact
    pub manifest_file: String,
    /// Create `addons_dir` on discovery when missing
    pub create_addons_dir: bool,
    /// Disable enabled dependents before disabling or unloading an addon
    pub cascade_disable: bool,
    /// Warn when a hook runs longer than this
    pub slow_hook_warning_ms: u64,
}

impl AddonHostConfig {
    /// Config rooted at explicit directories, other fields defaulted
    pub fn with_dirs(addons_dir: impl Into<PathBuf>, data_dir: impl Into<PathBuf>) -> Self {
        Self {
            addons_dir: addons_dir.into(),
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    pub fn slow_hook_warning(&self) -> Duration {
        Duration::from_millis(self.slow_hook_warning_ms)
    }
}

impl Default for AddonHostConfig {
    fn default() -> Self {
        Self {
            addons_dir: addonhost_paths::config_dir().join("addons"),
            data_dir: addonhost_paths::data_dir(),
            manifest_file: DEFAULT_MANIFEST_FILE.to_string(),
            create_addons_dir: true,
            cascade_disable: false,
            slow_hook_warning_ms: DEFAULT_SLOW_HOOK_WARNING_MS,
        }
    }
}
