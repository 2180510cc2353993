pub mod config;
pub mod list;
pub mod run;

use crate::config::HostFileConfig;
use clap::Args;
use std::path::PathBuf;

/// Flags shared by every command that builds a host; they override the
/// config files
#[derive(Args, Debug, Clone, Default)]
pub struct HostArgs {
    /// Directory scanned for addon artifacts
    #[arg(long, value_name = "DIR")]
    pub addons_dir: Option<PathBuf>,

    /// Root of per-addon data folders
    #[arg(long, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Host service available at startup (repeatable)
    #[arg(long = "service", value_name = "NAME")]
    pub services: Vec<String>,

    /// Disable enabled dependents before their dependency
    #[arg(long)]
    pub cascade_disable: bool,
}

impl HostArgs {
    /// Apply the flags on top of the merged file configuration
    pub fn apply(&self, mut config: HostFileConfig) -> HostFileConfig {
        if let Some(dir) = &self.addons_dir {
            config.addons.addons_dir = dir.clone();
        }
        if let Some(dir) = &self.data_dir {
            config.addons.data_dir = dir.clone();
        }
        if self.cascade_disable {
            config.addons.cascade_disable = true;
        }
        for service in &self.services {
            if !config.services.enabled.contains(service) {
                config.services.enabled.push(service.clone());
            }
        }
        config
    }
}
