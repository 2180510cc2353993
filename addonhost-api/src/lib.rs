//! addonhost-api - Addon API for the addonhost extension host
//!
//! This crate provides the traits and types needed to write addons. Addons
//! are native Rust dynamic libraries (or compiled-in types) that the host
//! loads, enables, disables, reloads and unloads, and that register commands
//! into the host's shared command table while enabled.
//!
//! # Example
//!
//! ```ignore
//! use addonhost_api::{
//!     Addon, AddonContext, AddonError, CommandInvocation, CommandOutput, CommandSpec, HostHandle,
//!     export_addons,
//! };
//!
//! pub struct StatsAddon;
//!
//! impl StatsAddon {
//!     fn create(_host: HostHandle) -> Result<Box<dyn Addon>, AddonError> {
//!         Ok(Box::new(StatsAddon))
//!     }
//! }
//!
//! impl Addon for StatsAddon {
//!     fn on_enable(&mut self, ctx: &mut AddonContext) -> Result<(), AddonError> {
//!         ctx.register_command(
//!             CommandSpec::new("leadingnation"),
//!             |_inv: &CommandInvocation| -> Result<CommandOutput, AddonError> {
//!                 Ok(CommandOutput::Text("Naboo".into()))
//!             },
//!         )
//!     }
//!
//!     fn on_disable(&mut self, _ctx: &mut AddonContext) -> Result<(), AddonError> {
//!         Ok(())
//!     }
//! }
//!
//! export_addons!("stats" => StatsAddon::create);
//! ```

pub mod command;
pub mod context;
pub mod entry;
pub mod error;
pub mod host;
pub mod types;

pub use command::{
    CommandHandler, CommandInvocation, CommandOutput, CommandRegistration, CommandSpec,
};
pub use context::{AddonConfig, AddonContext};
pub use entry::{AddonDeclaration, Constructor, DECLARATION_SYMBOL, EntryPoint};
pub use error::AddonError;
pub use host::{CommandNamespace, HostHandle, HostServices};
pub use types::{AddonState, AddonStatus};

/// Current addon API version. Libraries must match this exactly.
pub const API_VERSION: u32 = 1;

/// Capability tag of the addon lifecycle interface
pub const ADDON_CAPABILITY: &str = "addonhost.addon/1";

/// The capability interface every addon implements.
///
/// Hooks are called sequentially from the host's control thread. Returning
/// `Err` (or panicking) from `on_load` or `on_enable` moves the addon to
/// FAILED; a failing `on_reload` is only logged.
pub trait Addon: Send {
    /// Called once after construction, before the addon is registered
    fn on_load(&mut self, _ctx: &mut AddonContext) -> Result<(), AddonError> {
        Ok(())
    }

    /// Called when the addon should start working. Register commands here.
    fn on_enable(&mut self, ctx: &mut AddonContext) -> Result<(), AddonError>;

    /// Called when the addon should stop. The host revokes every command the
    /// addon owns after this returns, whether or not the addon cleaned up.
    fn on_disable(&mut self, ctx: &mut AddonContext) -> Result<(), AddonError>;

    /// Called when the addon should re-read its configuration
    fn on_reload(&mut self, _ctx: &mut AddonContext) -> Result<(), AddonError> {
        Ok(())
    }
}
