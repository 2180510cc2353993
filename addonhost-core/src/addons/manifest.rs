//! Manifest reader - parses `addon.toml` into an [`AddonDescriptor`]

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::error::ManifestError;

const UNKNOWN: &str = "Unknown";

/// Immutable metadata of an addon, parsed from its manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddonDescriptor {
    /// Unique key, derived from `name` when the manifest has no `id`
    pub id: String,
    pub name: String,
    /// Opaque; compared only for equality and display
    pub version: String,
    pub authors: Vec<String>,
    pub description: Option<String>,
    /// Ids of addons this one requires, in manifest order without duplicates
    pub addon_dependencies: Vec<String>,
    /// Names of host services this one requires
    pub host_service_dependencies: Vec<String>,
    /// Entry-point identifier used to instantiate the implementation
    pub entry_point: String,
    /// Library file name inside the artifact, when not the default
    pub library: Option<String>,
}

impl AddonDescriptor {
    /// A descriptor for a compiled-in addon with no dependencies
    pub fn builtin(name: impl Into<String>, version: impl Into<String>) -> Self {
        let name = name.into();
        let id = derive_id(&name);
        Self {
            entry_point: id.clone(),
            id,
            name,
            version: version.into(),
            authors: vec![UNKNOWN.to_string()],
            description: None,
            addon_dependencies: Vec::new(),
            host_service_dependencies: Vec::new(),
            library: None,
        }
    }

    /// Builder: require another addon
    pub fn depends_on(mut self, addon_id: impl Into<String>) -> Self {
        push_unique(&mut self.addon_dependencies, addon_id.into());
        self
    }

    /// Builder: require a host service
    pub fn requires_service(mut self, service: impl Into<String>) -> Self {
        push_unique(&mut self.host_service_dependencies, service.into());
        self
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    fn into_vec(self) -> Vec<String> {
        match self {
            Self::One(value) => vec![value],
            Self::Many(values) => values,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawManifest {
    id: Option<String>,
    name: Option<String>,
    version: Option<String>,
    description: Option<String>,
    authors: Option<OneOrMany>,
    author: Option<String>,
    #[serde(default)]
    dependencies: Vec<String>,
    #[serde(default, rename = "plugin-dependencies")]
    plugin_dependencies: Vec<String>,
    main: Option<String>,
    library: Option<String>,
}

/// Parse raw manifest bytes.
///
/// `fallback_name` (normally the artifact directory name) stands in for a
/// missing `name` and anchors id derivation when nothing else yields one.
pub fn read_manifest(bytes: &[u8], fallback_name: &str) -> Result<AddonDescriptor, ManifestError> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| ManifestError::Malformed(format!("not UTF-8: {}", e)))?;
    let raw: RawManifest =
        toml::from_str(text).map_err(|e| ManifestError::Malformed(e.to_string()))?;

    let entry_point = non_blank(raw.main).ok_or(ManifestError::MissingEntryPoint)?;
    let name = non_blank(raw.name).unwrap_or_else(|| fallback_name.to_string());

    let id = non_blank(raw.id)
        .map(|id| id.to_lowercase())
        .or_else(|| non_empty(derive_id(&name)))
        .or_else(|| non_empty(derive_id(fallback_name)))
        .ok_or_else(|| {
            ManifestError::Malformed(format!("cannot derive an addon id from '{}'", name))
        })?;

    let mut authors: Vec<String> = match (raw.authors, raw.author) {
        (Some(authors), _) => authors.into_vec(),
        (None, Some(author)) => vec![author],
        (None, None) => Vec::new(),
    };
    authors.retain(|author| !author.trim().is_empty());
    if authors.is_empty() {
        authors.push(UNKNOWN.to_string());
    }

    Ok(AddonDescriptor {
        id,
        name,
        version: non_blank(raw.version).unwrap_or_else(|| UNKNOWN.to_string()),
        authors,
        description: non_blank(raw.description),
        addon_dependencies: dedup(raw.dependencies),
        host_service_dependencies: dedup(raw.plugin_dependencies),
        entry_point,
        library: non_blank(raw.library),
    })
}

/// Read the manifest resource `manifest_file` of the artifact at `artifact_dir`
pub fn read_manifest_file(
    artifact_dir: &Path,
    manifest_file: &str,
) -> Result<AddonDescriptor, ManifestError> {
    let path = artifact_dir.join(manifest_file);
    let bytes = match std::fs::read(&path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ManifestError::Missing { path });
        }
        Err(e) => return Err(ManifestError::Malformed(e.to_string())),
    };
    read_manifest(&bytes, &artifact_name(artifact_dir))
}

/// File identity of an artifact: its directory name
pub fn artifact_name(artifact_dir: &Path) -> String {
    artifact_dir
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Derive an addon id from a display name.
///
/// Lower-cases, collapses every run of characters outside `[a-z0-9]` into a
/// single `-`, and trims leading and trailing hyphens.
pub fn derive_id(name: &str) -> String {
    let mut id = String::with_capacity(name.len());
    let mut pending_hyphen = false;
    for c in name.to_lowercase().chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_hyphen && !id.is_empty() {
                id.push('-');
            }
            pending_hyphen = false;
            id.push(c);
        } else {
            pending_hyphen = true;
        }
    }
    id
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn non_empty(value: String) -> Option<String> {
    (!value.is_empty()).then_some(value)
}

fn push_unique(values: &mut Vec<String>, value: String) {
    if !values.contains(&value) {
        values.push(value);
    }
}

fn dedup(values: Vec<String>) -> Vec<String> {
    let mut out = Vec::with_capacity(values.len());
    for value in values {
        let value = value.trim().to_string();
        if !value.is_empty() {
            push_unique(&mut out, value);
        }
    }
    out
}
