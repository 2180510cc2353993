//! XDG Base Directory paths for addonhost.
//!
//! The host resolves XDG paths on every platform so an operator finds the
//! same layout everywhere: configuration and addon artifacts under the config
//! directory, per-addon data folders under the data directory.

use std::path::PathBuf;

const APP_DIR: &str = "addonhost";

/// Get the addonhost config directory.
///
/// Returns `$XDG_CONFIG_HOME/addonhost` if set, otherwise `~/.config/addonhost`.
/// This is where `config.toml` and the default `addons/` directory live.
///
/// # Examples
///
/// ```
/// use addonhost_paths::config_dir;
///
/// let config = config_dir();
/// let addons_dir = config.join("addons");
/// ```
pub fn config_dir() -> PathBuf {
    xdg_dir("XDG_CONFIG_HOME", ".config")
}

/// Get the addonhost data directory.
///
/// Returns `$XDG_DATA_HOME/addonhost` if set, otherwise `~/.local/share/addonhost`.
/// Each addon receives its own folder under `addons/<id>` here.
///
/// # Examples
///
/// ```
/// use addonhost_paths::data_dir;
///
/// let data = data_dir();
/// let addon_data = data.join("addons").join("stats");
/// ```
pub fn data_dir() -> PathBuf {
    xdg_dir("XDG_DATA_HOME", ".local/share")
}

fn xdg_dir(env_var: &str, home_relative: &str) -> PathBuf {
    match std::env::var(env_var) {
        Ok(base) if !base.is_empty() => PathBuf::from(base).join(APP_DIR),
        _ => match dirs::home_dir() {
            Some(home) => home.join(home_relative).join(APP_DIR),
            None => PathBuf::from(home_relative).join(APP_DIR),
        },
    }
}
