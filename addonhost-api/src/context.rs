//! AddonContext - an addon's interface to the host

use crate::command::{CommandHandler, CommandRegistration, CommandSpec, normalize_name};
use crate::error::AddonError;
use crate::host::HostHandle;
use crate::types::{AddonState, AddonStatus};
use serde::{Serialize, de::DeserializeOwned};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// File name of an addon's persistent configuration inside its data folder
pub const CONFIG_FILE: &str = "config.toml";

/// An addon's interface to the host.
///
/// The host creates one context per registered addon and passes it to every
/// lifecycle hook. It provides:
/// - the addon's id, data folder and persistent configuration
/// - staged command registration (committed by the host when `on_enable` succeeds)
/// - live host-service checks
/// - the addon's live [`AddonStatus`]
/// - logging tagged with the addon id
pub struct AddonContext {
    addon_id: String,
    data_dir: PathBuf,
    config: AddonConfig,
    host: HostHandle,
    status: AddonStatus,
    /// Registrations waiting for the host to commit them
    pending_commands: Vec<CommandRegistration>,
    /// Labels whose registration was refused during the current hook
    rejected: Vec<String>,
}

/// Addon configuration - persistent key-value store backed by TOML
#[derive(Debug)]
pub struct AddonConfig {
    values: HashMap<String, toml::Value>,
    dirty: bool,
}

impl AddonContext {
    /// Create a context with an empty config
    pub fn new(addon_id: impl Into<String>, host: HostHandle, status: AddonStatus) -> Self {
        Self::with_config(addon_id, host, status, AddonConfig::new())
    }

    /// Create a context with a pre-loaded config
    pub fn with_config(
        addon_id: impl Into<String>,
        host: HostHandle,
        status: AddonStatus,
        config: AddonConfig,
    ) -> Self {
        let addon_id = addon_id.into();
        let data_dir = host.addon_data_dir(&addon_id);
        Self {
            addon_id,
            data_dir,
            config,
            host,
            status,
            pending_commands: Vec::new(),
            rejected: Vec::new(),
        }
    }

    // ─── Identity & Storage ──────────────────────────────────────────

    /// The addon's id
    pub fn addon_id(&self) -> &str {
        &self.addon_id
    }

    /// The addon's data folder (`<data_root>/addons/<id>`), not created
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Create the data folder if needed and return it
    pub fn ensure_data_dir(&self) -> Result<&Path, AddonError> {
        std::fs::create_dir_all(&self.data_dir)?;
        Ok(&self.data_dir)
    }

    /// Path of the persistent config file
    pub fn config_path(&self) -> PathBuf {
        self.data_dir.join(CONFIG_FILE)
    }

    /// Handle to the host
    pub fn host(&self) -> &HostHandle {
        &self.host
    }

    /// Live status of this addon; clone it into command handlers as needed
    pub fn status(&self) -> AddonStatus {
        self.status.clone()
    }

    /// Current state of this addon
    pub fn state(&self) -> AddonState {
        self.status.get()
    }

    // ─── Configuration ───────────────────────────────────────────────

    /// Read a configuration value
    ///
    /// # Example
    /// ```ignore
    /// let expiry_hours: Option<u32> = ctx.config_get("expiry_hours");
    /// ```
    pub fn config_get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.config.get(key)
    }

    /// Write a configuration value (persisted by [`save_config`](Self::save_config))
    pub fn config_set<T: Serialize>(&mut self, key: &str, value: T) -> Result<(), AddonError> {
        self.config.set(key, value)
    }

    /// Check if the configuration has unsaved changes
    pub fn config_is_dirty(&self) -> bool {
        self.config.is_dirty()
    }

    /// Persist the configuration to the data folder
    pub fn save_config(&mut self) -> Result<(), AddonError> {
        let path = self.config_path();
        self.config.save(&path)
    }

    /// Discard in-memory values and re-read the config file
    pub fn reload_config(&mut self) -> Result<(), AddonError> {
        self.config = AddonConfig::load(&self.config_path())?;
        Ok(())
    }

    /// Get a mutable reference to the config
    pub fn config_mut(&mut self) -> &mut AddonConfig {
        &mut self.config
    }

    // ─── Command Registration ────────────────────────────────────────

    /// Register a command owned by this addon.
    ///
    /// Registration is staged: the host commits every staged command in one
    /// batch after `on_enable` returns `Ok`. A name or alias that is already
    /// live in the host's table, or already staged by this addon, is refused
    /// with [`AddonError::NameCollision`] and fails the enable transition.
    pub fn register_command(
        &mut self,
        spec: CommandSpec,
        handler: impl CommandHandler + 'static,
    ) -> Result<(), AddonError> {
        self.register(CommandRegistration::new(spec, handler))
    }

    /// Register a prepared [`CommandRegistration`]
    pub fn register(&mut self, registration: CommandRegistration) -> Result<(), AddonError> {
        if let Err(e) = registration.spec.validate() {
            self.rejected.push(registration.spec.name.clone());
            return Err(e);
        }

        let mut seen: Vec<&str> = Vec::new();
        for label in registration.spec.labels() {
            let staged = seen.contains(&label)
                || self
                    .pending_commands
                    .iter()
                    .any(|pending| pending.spec.labels().any(|l| l == label));
            if staged || self.host.commands().is_taken(label) {
                let label = label.to_string();
                self.rejected.push(label.clone());
                return Err(AddonError::NameCollision(label));
            }
            seen.push(label);
        }

        self.pending_commands.push(registration);
        Ok(())
    }

    /// Unregister one of this addon's commands.
    ///
    /// Removes a staged registration, or releases a committed one from the
    /// host's table. Returns false if this addon has no such command.
    pub fn unregister_command(&mut self, name: &str) -> bool {
        let name = normalize_name(name);
        let before = self.pending_commands.len();
        self.pending_commands.retain(|pending| pending.spec.name != name);
        if self.pending_commands.len() != before {
            return true;
        }
        self.host.commands().release(&self.addon_id, &name)
    }

    /// Commands staged for registration (used by the host)
    pub fn pending_commands(&self) -> &[CommandRegistration] {
        &self.pending_commands
    }

    /// Take staged commands (used by the host to commit them)
    pub fn take_pending_commands(&mut self) -> Vec<CommandRegistration> {
        std::mem::take(&mut self.pending_commands)
    }

    /// Labels refused since the last [`clear_staging`](Self::clear_staging)
    pub fn rejected_commands(&self) -> &[String] {
        &self.rejected
    }

    /// Drop staged registrations and refusals (used by the host between hooks)
    pub fn clear_staging(&mut self) {
        self.pending_commands.clear();
        self.rejected.clear();
    }

    // ─── Host Services ───────────────────────────────────────────────

    /// Live check of a host service
    pub fn is_service_available(&self, name: &str) -> bool {
        self.host.is_service_available(name)
    }

    /// The subset of `services` not available right now
    pub fn missing_services<'a>(&self, services: &'a [String]) -> Vec<&'a str> {
        services
            .iter()
            .map(String::as_str)
            .filter(|name| !self.is_service_available(name))
            .collect()
    }

    // ─── Logging ─────────────────────────────────────────────────────

    /// Log an info message (tagged with the addon id)
    pub fn log_info(&self, message: &str) {
        tracing::info!(addon = %self.addon_id, "{}", message);
    }

    /// Log a warning message
    pub fn log_warn(&self, message: &str) {
        tracing::warn!(addon = %self.addon_id, "{}", message);
    }

    /// Log an error message
    pub fn log_error(&self, message: &str) {
        tracing::error!(addon = %self.addon_id, "{}", message);
    }

    /// Log a debug message
    pub fn log_debug(&self, message: &str) {
        tracing::debug!(addon = %self.addon_id, "{}", message);
    }
}

impl AddonConfig {
    /// Create a new empty config
    pub fn new() -> Self {
        Self {
            values: HashMap::new(),
            dirty: false,
        }
    }

    /// Load configuration from a TOML file; a missing file is an empty config
    pub fn load(path: &Path) -> Result<Self, AddonError> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let content = std::fs::read_to_string(path)?;
        let values: HashMap<String, toml::Value> =
            toml::from_str(&content).map_err(|e| AddonError::Config(e.to_string()))?;
        Ok(Self {
            values,
            dirty: false,
        })
    }

    /// Save configuration to a TOML file
    pub fn save(&mut self, path: &Path) -> Result<(), AddonError> {
        let content = toml::to_string_pretty(&self.values)
            .map_err(|e| AddonError::Serialization(e.to_string()))?;

        if let Some(parent) = path.parent().filter(|p| !p.exists()) {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content)?;
        self.dirty = false;
        Ok(())
    }

    /// Get a configuration value
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.values.get(key).and_then(|v| v.clone().try_into().ok())
    }

    /// Set a configuration value
    pub fn set<T: Serialize>(&mut self, key: &str, value: T) -> Result<(), AddonError> {
        let toml_value =
            toml::Value::try_from(value).map_err(|e| AddonError::Serialization(e.to_string()))?;
        self.values.insert(key.to_string(), toml_value);
        self.dirty = true;
        Ok(())
    }

    /// Whether a key is present
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Insert each default whose key is missing; returns the number inserted
    pub fn apply_defaults<I, T>(&mut self, defaults: I) -> Result<usize, AddonError>
    where
        I: IntoIterator<Item = (&'static str, T)>,
        T: Serialize,
    {
        let mut inserted = 0;
        for (key, value) in defaults {
            if !self.contains(key) {
                self.set(key, value)?;
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    /// Check if the config has been modified since loading/saving
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Mark the config as clean
    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }
}

impl Default for AddonConfig {
    fn default() -> Self {
        Self::new()
    }
}
