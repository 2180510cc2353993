//! Addon system for addonhost
//!
//! This module provides the infrastructure for discovering, loading and
//! driving addons through their lifecycle:
//!
//! - [`AddonManager`]: The lifecycle manager (load, enable, disable, reload, unload)
//! - [`AddonRegistry`]: Tracks loaded addons, their state and origin artifact
//! - [`FailureLedger`]: Records artifacts that failed to load
//! - [`ModuleLoader`]: Turns an artifact directory into a live addon instance
//! - [`AddonHostError`]: Error types for addon operations
//!
//! # Artifact Layout
//!
//! Each subdirectory of the addons directory is one artifact:
//! - `addon.toml` - the manifest (name, version, main, dependencies)
//! - `<name>.so` or `lib<name>.so` (`.dylib`/`.dll`) - the native library
//!
//! # Example
//!
//! ```ignore
//! use addonhost_core::addons::{AddonManager, NativeLoader};
//! use addonhost_core::{AddonHostConfig, ServiceDirectory};
//!
//! let mut manager = AddonManager::new(
//!     AddonHostConfig::default(),
//!     NativeLoader,
//!     Arc::new(ServiceDirectory::new()),
//! );
//!
//! manager.load_new()?;
//! manager.enable_all();
//! manager.disable("stats")?;
//! ```

pub mod error;
mod ledger;
mod loader;
mod manager;
mod manifest;
mod registry;
pub mod resolver;
mod scanner;

pub use error::{AddonHostError, HookPhase, LoadError, ManifestError};
pub use ledger::{FailureLedger, FailureRecord};
pub use loader::{
    LoadedModule, ModuleLoader, NativeLoader, StaticLoader, find_library, resolve_entry,
};
pub use manager::{AddonInfo, AddonManager, BulkOutcome};
pub use manifest::{AddonDescriptor, artifact_name, derive_id, read_manifest, read_manifest_file};
pub use registry::{AddonInstance, AddonRegistry};
pub use resolver::{AddonStates, DependencyScope, Resolution};
pub use scanner::{Discovery, DiscoveryScanner};
