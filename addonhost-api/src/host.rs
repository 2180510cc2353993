//! The host as seen from an addon

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Services provided by the surrounding application (an economy provider,
/// a permissions backend, ...).
///
/// Presence is checked live on every call; services start and stop
/// independently of addon lifecycles.
pub trait HostServices: Send + Sync {
    /// Whether the named service is present and enabled right now
    fn is_service_available(&self, name: &str) -> bool;
}

/// Read and owner-scoped release access to the host's command table.
///
/// Implemented by the host's command table; addons reach it through
/// [`crate::AddonContext`].
///
/// Command handlers run while the host holds the table's read lock.
/// `is_taken` is safe to call from a handler; `release` is not and
/// deadlocks the dispatching thread. Release commands from lifecycle hooks.
pub trait CommandNamespace: Send + Sync {
    /// Whether a primary name or alias is taken (case-insensitive)
    fn is_taken(&self, label: &str) -> bool;

    /// Remove the command `name` if `owner` owns it. Returns true if removed.
    fn release(&self, owner: &str, name: &str) -> bool;
}

/// Handle to the host, passed to every addon constructor.
///
/// Cheap to clone; every clone refers to the same host.
#[derive(Clone)]
pub struct HostHandle {
    services: Arc<dyn HostServices>,
    commands: Arc<dyn CommandNamespace>,
    data_root: PathBuf,
}

impl HostHandle {
    /// Create a handle from the host's service view, command table and data root
    pub fn new(
        services: Arc<dyn HostServices>,
        commands: Arc<dyn CommandNamespace>,
        data_root: PathBuf,
    ) -> Self {
        Self {
            services,
            commands,
            data_root,
        }
    }

    /// Live host-service presence check
    pub fn is_service_available(&self, name: &str) -> bool {
        self.services.is_service_available(name)
    }

    /// The host's command table (read/release view). Only `is_taken` may be
    /// called from inside a command handler.
    pub fn commands(&self) -> &dyn CommandNamespace {
        self.commands.as_ref()
    }

    /// Root of all addon data folders
    pub fn data_root(&self) -> &Path {
        &self.data_root
    }

    /// Data folder for the addon with the given id: `<data_root>/addons/<id>`
    pub fn addon_data_dir(&self, addon_id: &str) -> PathBuf {
        self.data_root.join("addons").join(addon_id)
    }
}

impl fmt::Debug for HostHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostHandle")
            .field("data_root", &self.data_root)
            .finish_non_exhaustive()
    }
}
