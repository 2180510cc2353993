//! Host services directory

use parking_lot::RwLock;
use std::collections::BTreeMap;

use addonhost_api::HostServices;

/// Services provided by the surrounding application, each started or stopped
/// independently of addon lifecycles
#[derive(Debug, Default)]
pub struct ServiceDirectory {
    /// Service name -> enabled
    services: RwLock<BTreeMap<String, bool>>,
}

impl ServiceDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a directory with the given services present and enabled
    pub fn with_services<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let directory = Self::new();
        for name in names {
            directory.register(name, true);
        }
        directory
    }

    /// Make a service present, enabled or not
    pub fn register(&self, name: impl Into<String>, enabled: bool) {
        self.services.write().insert(name.into(), enabled);
    }

    /// Enable a service, registering it if unknown. Returns true if it was
    /// not already enabled.
    pub fn start(&self, name: &str) -> bool {
        let previous = self.services.write().insert(name.to_string(), true);
        previous != Some(true)
    }

    /// Disable a present service. Returns true if it was enabled.
    pub fn stop(&self, name: &str) -> bool {
        match self.services.write().get_mut(name) {
            Some(enabled) if *enabled => {
                *enabled = false;
                true
            }
            _ => false,
        }
    }

    /// Remove a service entirely
    pub fn remove(&self, name: &str) -> bool {
        self.services.write().remove(name).is_some()
    }

    /// Every known service with its enabled flag, sorted by name
    pub fn list(&self) -> Vec<(String, bool)> {
        self.services
            .read()
            .iter()
            .map(|(name, enabled)| (name.clone(), *enabled))
            .collect()
    }
}

impl HostServices for ServiceDirectory {
    fn is_service_available(&self, name: &str) -> bool {
        self.services.read().get(name).copied().unwrap_or(false)
    }
}
