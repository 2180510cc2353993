//! Module loader - turns an artifact plus descriptor into a live addon instance

use libloading::Library;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use addonhost_api::{
    ADDON_CAPABILITY, API_VERSION, Addon, AddonDeclaration, AddonError, Constructor,
    DECLARATION_SYMBOL, HostHandle,
};

use super::error::{LoadError, panic_message};
use super::manifest::{AddonDescriptor, artifact_name};

/// A constructed addon, plus the library its code lives in
pub struct LoadedModule {
    // Field order matters: the instance must drop before its library.
    instance: Box<dyn Addon>,
    _library: Option<Library>,
}

impl LoadedModule {
    /// Wrap an instance whose code is linked into the host
    pub fn new(instance: Box<dyn Addon>) -> Self {
        Self {
            instance,
            _library: None,
        }
    }

    fn with_library(instance: Box<dyn Addon>, library: Library) -> Self {
        Self {
            instance,
            _library: Some(library),
        }
    }

    pub fn instance_mut(&mut self) -> &mut dyn Addon {
        self.instance.as_mut()
    }
}

impl std::fmt::Debug for LoadedModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedModule")
            .field("native", &self._library.is_some())
            .finish_non_exhaustive()
    }
}

/// Resolves an artifact's entry point and constructs it.
///
/// Implementations report every failure as a [`LoadError`] and never let a
/// panic from addon code escape.
pub trait ModuleLoader: Send + Sync {
    fn instantiate(
        &self,
        artifact_dir: &Path,
        descriptor: &AddonDescriptor,
        host: HostHandle,
    ) -> Result<LoadedModule, LoadError>;
}

/// Loads addons from native shared libraries exporting `_addonhost_declaration`
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeLoader;

impl ModuleLoader for NativeLoader {
    fn instantiate(
        &self,
        artifact_dir: &Path,
        descriptor: &AddonDescriptor,
        host: HostHandle,
    ) -> Result<LoadedModule, LoadError> {
        let lib_path = find_library(artifact_dir, descriptor.library.as_deref())?;

        // SAFETY: the operator placed this library in the addons directory.
        // It is expected to be built against this addonhost-api version.
        let library = unsafe { Library::new(&lib_path)? };

        let construct = {
            // SAFETY: the symbol is the static emitted by `export_addons!`.
            // The reference is only used while `library` is alive.
            let declaration: &AddonDeclaration = unsafe {
                let symbol = library
                    .get::<*const AddonDeclaration>(DECLARATION_SYMBOL)
                    .map_err(|_| LoadError::EntryPointNotFound {
                        entry: descriptor.entry_point.clone(),
                    })?;
                &**symbol
            };
            resolve_entry(declaration, &descriptor.entry_point)?
        };

        let instance = construct_guarded(&descriptor.entry_point, || construct(host))?;
        tracing::debug!(
            artifact = %artifact_name(artifact_dir),
            library = %lib_path.display(),
            "Native addon constructed"
        );
        Ok(LoadedModule::with_library(instance, library))
    }
}

/// Check a declaration advertises a constructible addon entry named `entry`
pub fn resolve_entry(declaration: &AddonDeclaration, entry: &str) -> Result<Constructor, LoadError> {
    if !declaration.is_compatible() {
        return Err(LoadError::EntryPointWrongCapability {
            entry: entry.to_string(),
            reason: format!(
                "built against API version {}, host expects {}",
                declaration.api_version, API_VERSION
            ),
        });
    }

    let point = declaration
        .entry(entry)
        .ok_or_else(|| LoadError::EntryPointNotFound {
            entry: entry.to_string(),
        })?;
    check_capability(entry, point.capability)?;
    point.construct.ok_or_else(|| LoadError::NoCompatibleConstructor {
        entry: entry.to_string(),
    })
}

fn check_capability(entry: &str, capability: &str) -> Result<(), LoadError> {
    if capability == ADDON_CAPABILITY {
        Ok(())
    } else {
        Err(LoadError::EntryPointWrongCapability {
            entry: entry.to_string(),
            reason: format!("capability '{}', expected '{}'", capability, ADDON_CAPABILITY),
        })
    }
}

fn construct_guarded<F>(entry: &str, construct: F) -> Result<Box<dyn Addon>, LoadError>
where
    F: FnOnce() -> Result<Box<dyn Addon>, AddonError>,
{
    match std::panic::catch_unwind(AssertUnwindSafe(construct)) {
        Ok(Ok(instance)) => Ok(instance),
        Ok(Err(e)) => Err(LoadError::ConstructionFailed {
            entry: entry.to_string(),
            cause: e.to_string(),
        }),
        Err(payload) => Err(LoadError::ConstructionFailed {
            entry: entry.to_string(),
            cause: format!("constructor panicked: {}", panic_message(payload.as_ref())),
        }),
    }
}

/// Find the library file in an artifact directory.
///
/// Uses the manifest's `library` field when present, else looks for
/// `<dir>.<ext>` then `lib<dir>.<ext>`.
pub fn find_library(dir: &Path, explicit: Option<&str>) -> Result<PathBuf, LoadError> {
    if let Some(file) = explicit {
        let lib_path = dir.join(file);
        if lib_path.is_file() {
            return Ok(lib_path);
        }
        return Err(LoadError::LibraryNotFound {
            dir: dir.to_path_buf(),
        });
    }

    let name = artifact_name(dir);
    let extensions = if cfg!(target_os = "macos") {
        vec!["dylib", "so"]
    } else if cfg!(target_os = "windows") {
        vec!["dll"]
    } else {
        vec!["so"]
    };

    for ext in extensions {
        let lib_path = dir.join(format!("{}.{}", name, ext));
        if lib_path.is_file() {
            return Ok(lib_path);
        }

        let lib_path = dir.join(format!("lib{}.{}", name, ext));
        if lib_path.is_file() {
            return Ok(lib_path);
        }
    }

    Err(LoadError::LibraryNotFound {
        dir: dir.to_path_buf(),
    })
}

type Factory = Arc<dyn Fn(HostHandle) -> Result<Box<dyn Addon>, AddonError> + Send + Sync>;

struct StaticEntry {
    capability: String,
    factory: Option<Factory>,
}

/// Compiled-in registry from entry-point name to constructor.
///
/// For hosts that link their addons statically. Artifacts still carry an
/// `addon.toml`; only the library lookup is skipped.
#[derive(Default)]
pub struct StaticLoader {
    entries: HashMap<String, StaticEntry>,
}

impl StaticLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a constructor under an entry-point name
    pub fn register<F>(&mut self, entry: impl Into<String>, factory: F)
    where
        F: Fn(HostHandle) -> Result<Box<dyn Addon>, AddonError> + Send + Sync + 'static,
    {
        self.entries.insert(
            entry.into(),
            StaticEntry {
                capability: ADDON_CAPABILITY.to_string(),
                factory: Some(Arc::new(factory)),
            },
        );
    }

    /// Builder form of [`StaticLoader::register`]
    pub fn with<F>(mut self, entry: impl Into<String>, factory: F) -> Self
    where
        F: Fn(HostHandle) -> Result<Box<dyn Addon>, AddonError> + Send + Sync + 'static,
    {
        self.register(entry, factory);
        self
    }

    /// Declare an entry point without a constructor
    pub fn declare(&mut self, entry: impl Into<String>, capability: impl Into<String>) {
        self.entries.insert(
            entry.into(),
            StaticEntry {
                capability: capability.into(),
                factory: None,
            },
        );
    }

    /// Register every entry of a declaration produced by `export_addons!`
    pub fn register_declaration(&mut self, declaration: &'static AddonDeclaration) {
        for point in declaration.entries {
            let factory = point
                .construct
                .map(|construct| Arc::new(construct) as Factory);
            self.entries.insert(
                point.name.to_string(),
                StaticEntry {
                    capability: point.capability.to_string(),
                    factory,
                },
            );
        }
    }

    pub fn contains(&self, entry: &str) -> bool {
        self.entries.contains_key(entry)
    }
}

impl ModuleLoader for StaticLoader {
    fn instantiate(
        &self,
        _artifact_dir: &Path,
        descriptor: &AddonDescriptor,
        host: HostHandle,
    ) -> Result<LoadedModule, LoadError> {
        let entry = &descriptor.entry_point;
        let found = self
            .entries
            .get(entry)
            .ok_or_else(|| LoadError::EntryPointNotFound {
                entry: entry.clone(),
            })?;
        check_capability(entry, &found.capability)?;
        let factory = found
            .factory
            .clone()
            .ok_or_else(|| LoadError::NoCompatibleConstructor {
                entry: entry.clone(),
            })?;

        let instance = construct_guarded(entry, || factory(host))?;
        Ok(LoadedModule::new(instance))
    }
}
