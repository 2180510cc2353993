//! Entry-point declarations exported by addon libraries

use crate::error::AddonError;
use crate::host::HostHandle;
use crate::{ADDON_CAPABILITY, API_VERSION, Addon};

/// Name of the data symbol every addon library exports
pub const DECLARATION_SYMBOL: &[u8] = b"_addonhost_declaration\0";

/// The single supported construction contract: one argument, a handle to the host
pub type Constructor = fn(HostHandle) -> Result<Box<dyn Addon>, AddonError>;

/// One instantiable (or declaration-only) entry point in an addon library
#[derive(Debug, Clone, Copy)]
pub struct EntryPoint {
    /// Identifier referenced by the manifest's `main` field
    pub name: &'static str,
    /// Capability tag; the host instantiates only [`ADDON_CAPABILITY`]
    pub capability: &'static str,
    /// Host-aware constructor; `None` for declaration-only entries
    pub construct: Option<Constructor>,
}

impl EntryPoint {
    /// An addon entry point with a host-aware constructor
    pub const fn new(name: &'static str, construct: Constructor) -> Self {
        Self {
            name,
            capability: ADDON_CAPABILITY,
            construct: Some(construct),
        }
    }

    /// An entry point the library declares but that cannot be constructed
    pub const fn declaration_only(name: &'static str) -> Self {
        Self {
            name,
            capability: ADDON_CAPABILITY,
            construct: None,
        }
    }

    /// An entry point implementing some other capability
    pub const fn with_capability(name: &'static str, capability: &'static str) -> Self {
        Self {
            name,
            capability,
            construct: None,
        }
    }
}

/// Everything an addon library exposes to the host
#[derive(Debug)]
pub struct AddonDeclaration {
    /// API version the library was built against
    pub api_version: u32,
    /// Exported entry points
    pub entries: &'static [EntryPoint],
}

impl AddonDeclaration {
    /// Find an entry point by name
    pub fn entry(&self, name: &str) -> Option<&EntryPoint> {
        self.entries.iter().find(|entry| entry.name == name)
    }

    /// Whether the library was built against this host's API version
    pub fn is_compatible(&self) -> bool {
        self.api_version == API_VERSION
    }
}

/// Export addon entry points for dynamic loading.
///
/// Generates the `_addonhost_declaration` symbol the host's native loader
/// reads. Each entry maps the identifier used in the manifest's `main` field
/// to a constructor `fn(HostHandle) -> Result<Box<dyn Addon>, AddonError>`.
///
/// # Usage
///
/// ```ignore
/// addonhost_api::export_addons! {
///     "bounties" => BountyAddon::create,
/// }
/// ```
#[macro_export]
macro_rules! export_addons {
    ($($name:literal => $construct:path),+ $(,)?) => {
        #[unsafe(no_mangle)]
        #[allow(non_upper_case_globals)]
        pub static _addonhost_declaration: $crate::AddonDeclaration = $crate::AddonDeclaration {
            api_version: $crate::API_VERSION,
            entries: &[$($crate::EntryPoint::new($name, $construct)),+],
        };
    };
}
