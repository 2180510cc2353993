//! addonhost-core: Extension host runtime
//!
//! This crate provides the host side of the addon system:
//!
//! - **Lifecycle management** - [`AddonManager`] discovers, loads, enables, disables,
//!   reloads and unloads addons
//! - **Command table** - [`CommandTable`] holds every live command and dispatches invocations
//! - **Host services** - [`ServiceDirectory`] tracks which host services are available
//! - **Lifecycle events** - [`LifecycleBus`] broadcasts [`LifecycleEvent`]s
//! - **Operator commands** - [`operator`] implements `addon list|info|load|...`
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use addonhost_core::{AddonHostConfig, AddonManager, NativeLoader, ServiceDirectory};
//!
//! fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let services = Arc::new(ServiceDirectory::with_services(["economy"]));
//!     let mut manager =
//!         AddonManager::new(AddonHostConfig::default(), NativeLoader, services);
//!
//!     let loaded = manager.load_new()?;
//!     println!("Loaded {} addons", loaded.succeeded.len());
//!     manager.enable_all();
//!
//!     manager.shutdown();
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────┐
//! │                   AddonManager                    │
//! │  ┌──────────────────┐  ┌────────────────────────┐ │
//! │  │ DiscoveryScanner │  │     ModuleLoader       │ │
//! │  └──────────────────┘  │ (NativeLoader/Static)  │ │
//! │  ┌──────────────────┐  └────────────────────────┘ │
//! │  │  AddonRegistry   │  ┌────────────────────────┐ │
//! │  │  FailureLedger   │  │ CommandTable (shared)  │ │
//! │  └──────────────────┘  └────────────────────────┘ │
//! └───────────────────────────────────────────────────┘
//! ```

pub mod addons;
pub mod commands;
pub mod config;
pub mod events;
pub mod operator;
pub mod services;

// Re-export key types for convenience
pub use addons::{
    AddonDescriptor, AddonHostError, AddonInfo, AddonManager, BulkOutcome, FailureLedger,
    LoadError, ManifestError, ModuleLoader, NativeLoader, StaticLoader,
};
pub use commands::{CommandInfo, CommandTable, CommandTableError, DispatchError};
pub use config::AddonHostConfig;
pub use events::{LifecycleBus, LifecycleEvent};
pub use operator::{OperatorCommand, OperatorReply, PermissionCheck};
pub use services::ServiceDirectory;
