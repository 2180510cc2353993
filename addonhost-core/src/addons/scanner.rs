//! Discovery scanner - classifies the artifacts in the addons directory

use std::path::{Path, PathBuf};

use super::ledger::FailureLedger;
use super::manifest::artifact_name;
use super::registry::AddonRegistry;

/// Artifacts in the addons directory, split three ways
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Discovery {
    /// Already loaded (in the registry's origin map)
    pub tracked: Vec<PathBuf>,
    /// Recorded in the failure ledger
    pub failed: Vec<PathBuf>,
    /// Neither; candidates for loading
    pub new: Vec<PathBuf>,
}

impl Discovery {
    pub fn total(&self) -> usize {
        self.tracked.len() + self.failed.len() + self.new.len()
    }
}

/// Walks one directory for artifacts. Reads the filesystem only.
#[derive(Debug, Clone)]
pub struct DiscoveryScanner {
    dir: PathBuf,
}

impl DiscoveryScanner {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Every artifact directory, sorted by name. Hidden entries are skipped;
    /// a missing directory yields nothing.
    pub fn artifacts(&self) -> std::io::Result<Vec<PathBuf>> {
        if !self.dir.exists() {
            tracing::debug!(dir = %self.dir.display(), "Addons directory does not exist");
            return Ok(Vec::new());
        }

        let mut found = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.is_dir() && !artifact_name(&path).starts_with('.') {
                found.push(path);
            }
        }
        found.sort();
        Ok(found)
    }

    /// Classify every artifact against the registry and the failure ledger
    pub fn scan(
        &self,
        registry: &AddonRegistry,
        ledger: &FailureLedger,
    ) -> std::io::Result<Discovery> {
        let mut discovery = Discovery::default();
        for path in self.artifacts()? {
            let name = artifact_name(&path);
            if registry.is_tracked(&name) {
                discovery.tracked.push(path);
            } else if ledger.contains(&name) {
                discovery.failed.push(path);
            } else {
                discovery.new.push(path);
            }
        }
        tracing::debug!(
            dir = %self.dir.display(),
            tracked = discovery.tracked.len(),
            failed = discovery.failed.len(),
            new = discovery.new.len(),
            "Addons directory scanned"
        );
        Ok(discovery)
    }
}
