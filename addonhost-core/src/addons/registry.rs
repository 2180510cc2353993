//! Addon registry - the single owner of addon identity and state

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use addonhost_api::{Addon, AddonContext, AddonState, AddonStatus};

use super::error::AddonHostError;
use super::loader::LoadedModule;
use super::manifest::{AddonDescriptor, artifact_name};
use super::resolver::AddonStates;

/// A registered addon: descriptor, live instance and its bookkeeping
pub struct AddonInstance {
    descriptor: AddonDescriptor,
    // Dropped before `module` so nothing in the context outlives addon code
    context: AddonContext,
    module: LoadedModule,
    status: AddonStatus,
    origin: Option<PathBuf>,
    last_error: Option<String>,
    loaded_at: DateTime<Utc>,
}

impl AddonInstance {
    pub fn new(
        descriptor: AddonDescriptor,
        module: LoadedModule,
        context: AddonContext,
        origin: Option<PathBuf>,
    ) -> Self {
        Self {
            status: context.status(),
            descriptor,
            context,
            module,
            origin,
            last_error: None,
            loaded_at: Utc::now(),
        }
    }

    pub fn id(&self) -> &str {
        &self.descriptor.id
    }

    pub fn descriptor(&self) -> &AddonDescriptor {
        &self.descriptor
    }

    pub fn state(&self) -> AddonState {
        self.status.get()
    }

    /// Live status handle shared with the addon's context
    pub fn status(&self) -> AddonStatus {
        self.status.clone()
    }

    /// Artifact directory the addon was loaded from; `None` for built-ins
    pub fn origin(&self) -> Option<&Path> {
        self.origin.as_deref()
    }

    /// File identity of the origin artifact
    pub fn artifact(&self) -> Option<String> {
        self.origin.as_deref().map(artifact_name)
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    pub fn context(&self) -> &AddonContext {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut AddonContext {
        &mut self.context
    }

    /// The instance and its context, borrowed together for a hook call
    pub fn parts_mut(&mut self) -> (&mut dyn Addon, &mut AddonContext) {
        (self.module.instance_mut(), &mut self.context)
    }
}

/// Registry of loaded addons, in registration order
#[derive(Default)]
pub struct AddonRegistry {
    addons: HashMap<String, AddonInstance>,
    /// Ids in registration order
    order: Vec<String>,
    /// Artifact file identity -> addon id
    origins: HashMap<String, String>,
}

impl AddonRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an addon. Fails if its id is already present.
    pub fn register(&mut self, instance: AddonInstance) -> Result<(), AddonHostError> {
        let id = instance.id().to_string();
        if self.addons.contains_key(&id) {
            return Err(AddonHostError::AlreadyRegistered(id));
        }
        if let Some(artifact) = instance.artifact() {
            self.origins.insert(artifact, id.clone());
        }
        self.order.push(id.clone());
        self.addons.insert(id, instance);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&AddonInstance> {
        self.addons.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut AddonInstance> {
        self.addons.get_mut(id)
    }

    /// Remove an addon and its origin mapping
    pub fn remove(&mut self, id: &str) -> Option<AddonInstance> {
        let instance = self.addons.remove(id)?;
        self.order.retain(|existing| existing != id);
        self.origins.retain(|_, owner| owner != id);
        Some(instance)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.addons.contains_key(id)
    }

    /// Every id, in registration order
    pub fn all_ids(&self) -> Vec<String> {
        self.order.clone()
    }

    /// Every addon, in registration order
    pub fn iter(&self) -> impl Iterator<Item = &AddonInstance> {
        self.order.iter().filter_map(|id| self.addons.get(id))
    }

    /// Update an addon's state, and its last error when moving to FAILED
    pub fn set_state(
        &mut self,
        id: &str,
        state: AddonState,
        error: Option<String>,
    ) -> Result<(), AddonHostError> {
        let instance = self
            .addons
            .get_mut(id)
            .ok_or_else(|| AddonHostError::NotFound(id.to_string()))?;
        instance.status.set(state);
        if error.is_some() || state != AddonState::Failed {
            instance.last_error = error;
        }
        Ok(())
    }

    /// Id of the addon loaded from the named artifact
    pub fn origin_of(&self, artifact: &str) -> Option<&str> {
        self.origins.get(artifact).map(String::as_str)
    }

    pub fn is_tracked(&self, artifact: &str) -> bool {
        self.origins.contains_key(artifact)
    }

    pub fn len(&self) -> usize {
        self.addons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addons.is_empty()
    }
}

impl AddonStates for AddonRegistry {
    fn state_of(&self, id: &str) -> Option<AddonState> {
        self.addons.get(id).map(AddonInstance::state)
    }
}
