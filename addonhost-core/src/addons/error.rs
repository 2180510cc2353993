//! Addon host error types

use std::any::Any;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use addonhost_api::AddonState;

/// Errors from reading an artifact's manifest
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ManifestError {
    /// The manifest resource is absent from the artifact
    #[error("Manifest not found: {path}")]
    Missing { path: PathBuf },

    /// The manifest is not valid UTF-8 TOML of the expected shape
    #[error("Malformed manifest: {0}")]
    Malformed(String),

    /// The manifest has no `main` entry-point field
    #[error("Manifest has no entry point ('main' field)")]
    MissingEntryPoint,
}

/// Errors from resolving and constructing an addon's entry point
#[derive(Error, Debug)]
pub enum LoadError {
    /// No shared library in the artifact directory
    #[error("Addon library not found in {dir}")]
    LibraryNotFound { dir: PathBuf },

    /// The shared library could not be opened
    #[error("Failed to open addon library: {0}")]
    Library(#[from] libloading::Error),

    /// The library does not export the requested entry point
    #[error("Entry point '{entry}' not found")]
    EntryPointNotFound { entry: String },

    /// The entry point does not implement the addon capability interface
    #[error("Entry point '{entry}' does not implement the addon interface: {reason}")]
    EntryPointWrongCapability { entry: String, reason: String },

    /// The entry point has no host-aware constructor
    #[error("Entry point '{entry}' has no compatible constructor")]
    NoCompatibleConstructor { entry: String },

    /// The constructor returned an error or panicked
    #[error("Construction of '{entry}' failed: {cause}")]
    ConstructionFailed { entry: String, cause: String },
}

/// Lifecycle hook identifiers, used in `HookThrew` errors and logs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookPhase {
    Load,
    Enable,
    Disable,
    Reload,
}

impl HookPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Load => "load",
            Self::Enable => "enable",
            Self::Disable => "disable",
            Self::Reload => "reload",
        }
    }
}

impl fmt::Display for HookPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors surfaced at the lifecycle manager boundary
#[derive(Error, Debug)]
pub enum AddonHostError {
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error(transparent)]
    Load(#[from] LoadError),

    /// Declared dependencies that are not currently satisfied
    #[error("Missing dependencies: {}", .0.join(", "))]
    DependencyMissing(Vec<String>),

    /// A lifecycle hook returned an error or panicked
    #[error("{phase} hook failed: {cause}")]
    HookThrew { phase: HookPhase, cause: String },

    /// A command name or alias is already taken
    #[error("Command name already registered: {0}")]
    NameCollision(String),

    /// A staged command could not be committed for a reason other than a collision
    #[error("Invalid command registration: {0}")]
    InvalidCommand(String),

    /// Another addon already holds this id
    #[error("Addon id already registered: {0}")]
    AlreadyRegistered(String),

    /// No addon with this id is registered
    #[error("Addon '{0}' not found")]
    NotFound(String),

    /// The operation is not valid from the addon's current state
    #[error("Cannot {operation} addon '{id}' while it is {state}")]
    InvalidState {
        id: String,
        state: AddonState,
        operation: &'static str,
    },

    /// No artifact with this name in the addons directory
    #[error("Artifact not found: {path}")]
    ArtifactNotFound { path: PathBuf },

    /// The artifact is already loaded
    #[error("Artifact '{0}' is already loaded")]
    AlreadyTracked(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AddonHostError {
    pub(crate) fn hook(phase: HookPhase, cause: impl Into<String>) -> Self {
        Self::HookThrew {
            phase,
            cause: cause.into(),
        }
    }
}

/// Best-effort text of a panic payload
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
