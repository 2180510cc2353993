//! Failure ledger - artifacts that failed to load, keyed by file identity

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::manifest::AddonDescriptor;

/// One failed artifact
#[derive(Debug, Clone)]
pub struct FailureRecord {
    /// Artifact directory name
    pub artifact: String,
    pub path: PathBuf,
    pub error: String,
    pub failed_at: DateTime<Utc>,
    /// Descriptor, when the manifest parsed before the failure
    pub preview: Option<AddonDescriptor>,
}

impl FailureRecord {
    /// Id to show for this failure: the manifest id if known, else the artifact
    pub fn display_id(&self) -> &str {
        self.preview
            .as_ref()
            .map(|descriptor| descriptor.id.as_str())
            .unwrap_or(&self.artifact)
    }
}

/// Artifacts that failed to load.
///
/// Discovery skips anything recorded here until an operator retry clears it.
#[derive(Debug, Default)]
pub struct FailureLedger {
    entries: BTreeMap<String, FailureRecord>,
}

impl FailureLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record (or replace) the failure of an artifact
    pub fn record(
        &mut self,
        artifact: impl Into<String>,
        path: &Path,
        error: impl Into<String>,
        preview: Option<AddonDescriptor>,
    ) {
        let artifact = artifact.into();
        self.entries.insert(
            artifact.clone(),
            FailureRecord {
                artifact,
                path: path.to_path_buf(),
                error: error.into(),
                failed_at: Utc::now(),
                preview,
            },
        );
    }

    pub fn contains(&self, artifact: &str) -> bool {
        self.entries.contains_key(artifact)
    }

    pub fn get(&self, artifact: &str) -> Option<&FailureRecord> {
        self.entries.get(artifact)
    }

    /// Find a record by manifest id or artifact name
    pub fn find(&self, id: &str) -> Option<&FailureRecord> {
        self.entries
            .get(id)
            .or_else(|| self.entries.values().find(|record| record.display_id() == id))
    }

    /// Forget a failure so the artifact can be retried
    pub fn clear(&mut self, artifact: &str) -> Option<FailureRecord> {
        self.entries.remove(artifact)
    }

    /// Records ordered by artifact name
    pub fn iter(&self) -> impl Iterator<Item = &FailureRecord> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
