use super::types::{
    HostFileConfig, RawAddonsConfig, RawHostFileConfig, RawServicesConfig, ServicesConfig,
};
use addonhost_core::AddonHostConfig;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Environment variable overriding the project config directory
pub const PROJECT_CONFIG_ENV: &str = "ADDONHOST_PROJECT_CONFIG_DIR";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load merged configuration (user + project)
    pub fn load() -> Result<HostFileConfig> {
        Self::load_layers(&[Self::user_config_path(), Self::project_config_path()])
    }

    /// Load and merge config files in order; later files win, missing files
    /// are skipped
    pub fn load_layers(paths: &[PathBuf]) -> Result<HostFileConfig> {
        let mut raw = RawHostFileConfig::default();
        for path in paths {
            if let Some(layer) = Self::read_raw(path)? {
                tracing::debug!(path = %path.display(), "Loaded config layer");
                raw = Self::merge_raw(raw, layer);
            }
        }

        // Convert to final config with defaults applied
        Ok(Self::finalize(raw))
    }

    /// Load a single config file, defaults when it does not exist
    pub fn load_from_path(path: &Path) -> Result<HostFileConfig> {
        let raw = Self::read_raw(path)?.unwrap_or_default();
        Ok(Self::finalize(raw))
    }

    fn read_raw(path: &Path) -> Result<Option<RawHostFileConfig>> {
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let raw = toml::from_str(&contents)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        Ok(Some(raw))
    }

    /// Get user config path (`<config_dir>/config.toml`)
    pub fn user_config_path() -> PathBuf {
        addonhost_paths::config_dir().join("config.toml")
    }

    /// Get project config path
    /// Can be overridden with ADDONHOST_PROJECT_CONFIG_DIR env var (useful for isolated tests)
    pub fn project_config_path() -> PathBuf {
        if let Ok(dir) = std::env::var(PROJECT_CONFIG_ENV) {
            PathBuf::from(dir).join("config.toml")
        } else {
            PathBuf::from(".addonhost/config.toml")
        }
    }

    /// Merge two raw configs (overlay values override base only if explicitly set)
    fn merge_raw(base: RawHostFileConfig, overlay: RawHostFileConfig) -> RawHostFileConfig {
        RawHostFileConfig {
            addons: RawAddonsConfig {
                addons_dir: overlay.addons.addons_dir.or(base.addons.addons_dir),
                data_dir: overlay.addons.data_dir.or(base.addons.data_dir),
                manifest_file: overlay.addons.manifest_file.or(base.addons.manifest_file),
                create_addons_dir: overlay
                    .addons
                    .create_addons_dir
                    .or(base.addons.create_addons_dir),
                cascade_disable: overlay
                    .addons
                    .cascade_disable
                    .or(base.addons.cascade_disable),
                slow_hook_warning_ms: overlay
                    .addons
                    .slow_hook_warning_ms
                    .or(base.addons.slow_hook_warning_ms),
            },
            services: RawServicesConfig {
                enabled: overlay.services.enabled.or(base.services.enabled),
            },
        }
    }

    /// Convert raw config to final config with defaults applied
    fn finalize(raw: RawHostFileConfig) -> HostFileConfig {
        let defaults = AddonHostConfig::default();
        HostFileConfig {
            addons: AddonHostConfig {
                addons_dir: raw.addons.addons_dir.unwrap_or(defaults.addons_dir),
                data_dir: raw.addons.data_dir.unwrap_or(defaults.data_dir),
                manifest_file: raw.addons.manifest_file.unwrap_or(defaults.manifest_file),
                create_addons_dir: raw
                    .addons
                    .create_addons_dir
                    .unwrap_or(defaults.create_addons_dir),
                cascade_disable: raw
                    .addons
                    .cascade_disable
                    .unwrap_or(defaults.cascade_disable),
                slow_hook_warning_ms: raw
                    .addons
                    .slow_hook_warning_ms
                    .unwrap_or(defaults.slow_hook_warning_ms),
            },
            services: ServicesConfig {
                enabled: raw.services.enabled.unwrap_or_default(),
            },
        }
    }
}
