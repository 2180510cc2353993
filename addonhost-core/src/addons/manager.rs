//! AddonManager - drives addons through their lifecycle
//!
//! All transitions run sequentially on the caller's (control) thread. Hook
//! calls never happen while the command table lock is held; the table is
//! touched only to commit or revoke a whole addon's commands.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;

use addonhost_api::{
    Addon, AddonConfig, AddonContext, AddonState, AddonStatus, HostHandle, HostServices,
};

use super::error::{AddonHostError, HookPhase, panic_message};
use super::ledger::{FailureLedger, FailureRecord};
use super::loader::{LoadedModule, ModuleLoader};
use super::manifest::{AddonDescriptor, artifact_name, read_manifest_file};
use super::registry::{AddonInstance, AddonRegistry};
use super::resolver::{self, DependencyScope};
use super::scanner::{Discovery, DiscoveryScanner};
use crate::commands::CommandTable;
use crate::config::AddonHostConfig;
use crate::events::{LifecycleBus, LifecycleEvent};

/// Everything known about one addon, artifact or failure, for display
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddonInfo {
    pub id: String,
    pub name: String,
    pub version: String,
    pub state: AddonState,
    /// Origin artifact directory name; `None` for built-ins
    pub artifact: Option<String>,
    pub description: Option<String>,
    pub authors: Vec<String>,
    pub addon_dependencies: Vec<String>,
    pub host_service_dependencies: Vec<String>,
    pub last_error: Option<String>,
    /// Primary names of the commands the addon currently owns
    pub commands: Vec<String>,
    pub loaded_at: Option<DateTime<Utc>>,
    pub failed_at: Option<DateTime<Utc>>,
}

impl AddonInfo {
    fn from_descriptor(descriptor: &AddonDescriptor, state: AddonState) -> Self {
        Self {
            id: descriptor.id.clone(),
            name: descriptor.name.clone(),
            version: descriptor.version.clone(),
            state,
            artifact: None,
            description: descriptor.description.clone(),
            authors: descriptor.authors.clone(),
            addon_dependencies: descriptor.addon_dependencies.clone(),
            host_service_dependencies: descriptor.host_service_dependencies.clone(),
            last_error: None,
            commands: Vec::new(),
            loaded_at: None,
            failed_at: None,
        }
    }

    /// An artifact with no descriptor preview
    fn bare(id: String, artifact: &str, state: AddonState) -> Self {
        Self {
            id,
            name: artifact.to_string(),
            version: "Unknown".to_string(),
            state,
            artifact: Some(artifact.to_string()),
            description: None,
            authors: Vec::new(),
            addon_dependencies: Vec::new(),
            host_service_dependencies: Vec::new(),
            last_error: None,
            commands: Vec::new(),
            loaded_at: None,
            failed_at: None,
        }
    }

    fn from_failure(record: &FailureRecord) -> Self {
        let mut info = match &record.preview {
            Some(descriptor) => Self::from_descriptor(descriptor, AddonState::Failed),
            None => Self::bare(record.artifact.clone(), &record.artifact, AddonState::Failed),
        };
        info.artifact = Some(record.artifact.clone());
        info.last_error = Some(record.error.clone());
        info.failed_at = Some(record.failed_at);
        info
    }

    fn unloaded(path: &Path, preview: Option<AddonDescriptor>) -> Self {
        let artifact = artifact_name(path);
        let mut info = match preview {
            Some(descriptor) => Self::from_descriptor(&descriptor, AddonState::Unloaded),
            None => Self::bare(
                format!("unloaded-{}", artifact),
                &artifact,
                AddonState::Unloaded,
            ),
        };
        info.artifact = Some(artifact);
        info
    }
}

/// Per-addon results of a bulk operation
#[derive(Debug, Default)]
pub struct BulkOutcome {
    /// Ids that completed the operation
    pub succeeded: Vec<String>,
    /// Id (or artifact name) and error of each failure
    pub failed: Vec<(String, AddonHostError)>,
}

impl BulkOutcome {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// The lifecycle manager
pub struct AddonManager {
    config: AddonHostConfig,
    loader: Box<dyn ModuleLoader>,
    registry: AddonRegistry,
    ledger: FailureLedger,
    commands: Arc<CommandTable>,
    services: Arc<dyn HostServices>,
    events: LifecycleBus,
}

impl AddonManager {
    /// Create a manager with its own empty command table
    pub fn new(
        config: AddonHostConfig,
        loader: impl ModuleLoader + 'static,
        services: Arc<dyn HostServices>,
    ) -> Self {
        Self {
            config,
            loader: Box::new(loader),
            registry: AddonRegistry::new(),
            ledger: FailureLedger::new(),
            commands: Arc::new(CommandTable::new()),
            services,
            events: LifecycleBus::default(),
        }
    }

    /// Use a command table shared with the host's dispatch path
    pub fn with_command_table(mut self, commands: Arc<CommandTable>) -> Self {
        self.commands = commands;
        self
    }

    pub fn config(&self) -> &AddonHostConfig {
        &self.config
    }

    pub fn commands(&self) -> &Arc<CommandTable> {
        &self.commands
    }

    pub fn registry(&self) -> &AddonRegistry {
        &self.registry
    }

    pub fn ledger(&self) -> &FailureLedger {
        &self.ledger
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.events.subscribe()
    }

    pub fn state(&self, id: &str) -> Option<AddonState> {
        self.registry.get(id).map(AddonInstance::state)
    }

    /// A handle to this host, as passed to addon constructors
    pub fn host_handle(&self) -> HostHandle {
        HostHandle::new(
            self.services.clone(),
            self.commands.clone(),
            self.config.data_dir.clone(),
        )
    }

    // ─── Discovery & Load ────────────────────────────────────────────

    fn scanner(&self) -> DiscoveryScanner {
        DiscoveryScanner::new(&self.config.addons_dir)
    }

    /// Classify the artifacts in the addons directory, creating the
    /// directory first when configured to
    pub fn discover(&self) -> Result<Discovery, AddonHostError> {
        let dir = &self.config.addons_dir;
        if self.config.create_addons_dir && !dir.exists() {
            std::fs::create_dir_all(dir)?;
            tracing::info!(dir = %dir.display(), "Created addons directory");
        }
        Ok(self.scanner().scan(&self.registry, &self.ledger)?)
    }

    /// Discover and load every new artifact, dependencies first.
    ///
    /// Each artifact fails on its own; one failure never stops the pass.
    pub fn load_new(&mut self) -> Result<BulkOutcome, AddonHostError> {
        let discovery = self.discover()?;
        let mut outcome = BulkOutcome::default();

        let mut parsed: Vec<(PathBuf, AddonDescriptor)> = Vec::new();
        for path in discovery.new {
            match read_manifest_file(&path, &self.config.manifest_file) {
                Ok(descriptor) => parsed.push((path, descriptor)),
                Err(e) => {
                    let name = artifact_name(&path);
                    let e = AddonHostError::from(e);
                    self.record_failure(&name, &path, &e, None);
                    outcome.failed.push((name, e));
                }
            }
        }

        let descriptors: Vec<&AddonDescriptor> = parsed.iter().map(|(_, d)| d).collect();
        let order = resolver::load_order(&descriptors);
        let mut slots: Vec<Option<(PathBuf, AddonDescriptor)>> =
            parsed.into_iter().map(Some).collect();

        for i in order {
            let Some((path, descriptor)) = slots[i].take() else {
                continue;
            };
            match self.load_descriptor(&path, descriptor) {
                Ok(id) => outcome.succeeded.push(id),
                Err(e) => outcome.failed.push((artifact_name(&path), e)),
            }
        }

        tracing::info!(
            loaded = outcome.succeeded.len(),
            failed = outcome.failed.len(),
            "Discovery pass complete"
        );
        Ok(outcome)
    }

    /// Load one artifact by directory name. Clears any failure-ledger entry
    /// first, so this is also the operator's retry path.
    pub fn load_artifact(&mut self, artifact: &str) -> Result<String, AddonHostError> {
        let path = self.config.addons_dir.join(artifact);
        if artifact.contains(['/', '\\']) || artifact.starts_with('.') || !path.is_dir() {
            return Err(AddonHostError::ArtifactNotFound { path });
        }

        let name = artifact_name(&path);
        if self.registry.is_tracked(&name) {
            return Err(AddonHostError::AlreadyTracked(name));
        }
        if self.ledger.clear(&name).is_some() {
            tracing::info!(artifact = %name, "Retrying previously failed artifact");
        }

        match read_manifest_file(&path, &self.config.manifest_file) {
            Ok(descriptor) => self.load_descriptor(&path, descriptor),
            Err(e) => {
                let e = AddonHostError::from(e);
                self.record_failure(&name, &path, &e, None);
                Err(e)
            }
        }
    }

    fn load_descriptor(
        &mut self,
        path: &Path,
        descriptor: AddonDescriptor,
    ) -> Result<String, AddonHostError> {
        let preview = descriptor.clone();
        match self.try_load(path, descriptor) {
            Ok(id) => Ok(id),
            Err(e) => {
                self.record_failure(&artifact_name(path), path, &e, Some(preview));
                Err(e)
            }
        }
    }

    fn try_load(
        &mut self,
        path: &Path,
        descriptor: AddonDescriptor,
    ) -> Result<String, AddonHostError> {
        self.precheck(&descriptor)?;
        let module = self
            .loader
            .instantiate(path, &descriptor, self.host_handle())?;
        self.admit(descriptor, module, Some(path.to_path_buf()))
    }

    /// Register a compiled-in addon. It passes the same dependency gate and
    /// load hook as an artifact but has no origin artifact.
    pub fn register_builtin(
        &mut self,
        descriptor: AddonDescriptor,
        instance: Box<dyn Addon>,
    ) -> Result<String, AddonHostError> {
        let id = descriptor.id.clone();
        let result = self
            .precheck(&descriptor)
            .and_then(|()| self.admit(descriptor, LoadedModule::new(instance), None));
        if let Err(e) = &result {
            tracing::error!(addon = %id, error = %e, "Failed to register built-in addon");
            self.events.publish(LifecycleEvent::Failed {
                id,
                error: e.to_string(),
            });
        }
        result
    }

    /// Id uniqueness and load-time dependency gate
    fn precheck(&self, descriptor: &AddonDescriptor) -> Result<(), AddonHostError> {
        if self.registry.contains(&descriptor.id) {
            return Err(AddonHostError::AlreadyRegistered(descriptor.id.clone()));
        }
        resolver::check(
            descriptor,
            &self.registry,
            self.services.as_ref(),
            DependencyScope::Load,
        )
        .into_result()
    }

    /// Run the load hook and hand the instance to the registry
    fn admit(
        &mut self,
        descriptor: AddonDescriptor,
        mut module: LoadedModule,
        origin: Option<PathBuf>,
    ) -> Result<String, AddonHostError> {
        let id = descriptor.id.clone();
        let status = AddonStatus::default();
        let mut context = self.new_context(&id, status.clone());

        let hook = invoke_hook(
            module.instance_mut(),
            &mut context,
            HookPhase::Load,
            self.config.slow_hook_warning(),
        );
        discard_staged(&mut context, HookPhase::Load);
        hook?;

        status.set(AddonState::Loaded);
        self.registry
            .register(AddonInstance::new(descriptor, module, context, origin))?;

        tracing::info!(addon = %id, "Addon loaded");
        self.events.publish(LifecycleEvent::Loaded { id: id.clone() });
        Ok(id)
    }

    fn new_context(&self, id: &str, status: AddonStatus) -> AddonContext {
        let host = self.host_handle();
        let config_path = host
            .addon_data_dir(id)
            .join(addonhost_api::context::CONFIG_FILE);
        let config = AddonConfig::load(&config_path).unwrap_or_else(|e| {
            tracing::warn!(addon = %id, error = %e, "Addon config unreadable, starting empty");
            AddonConfig::default()
        });
        AddonContext::with_config(id, host, status, config)
    }

    fn record_failure(
        &mut self,
        artifact: &str,
        path: &Path,
        error: &AddonHostError,
        preview: Option<AddonDescriptor>,
    ) {
        tracing::error!(artifact = %artifact, error = %error, "Failed to load addon");
        let id = preview
            .as_ref()
            .map(|descriptor| descriptor.id.clone())
            .unwrap_or_else(|| artifact.to_string());
        self.ledger
            .record(artifact, path, error.to_string(), preview);
        self.events.publish(LifecycleEvent::Failed {
            id,
            error: error.to_string(),
        });
    }

    // ─── Transitions ─────────────────────────────────────────────────

    /// LOADED | DISABLED -> ENABLED.
    ///
    /// A dependency veto leaves the state unchanged. A hook failure, a
    /// refused registration or a commit collision moves the addon to FAILED
    /// with none of its commands left in the table.
    pub fn enable(&mut self, id: &str) -> Result<(), AddonHostError> {
        let instance = self
            .registry
            .get(id)
            .ok_or_else(|| AddonHostError::NotFound(id.to_string()))?;
        let state = instance.state();
        if !matches!(state, AddonState::Loaded | AddonState::Disabled) {
            return Err(AddonHostError::InvalidState {
                id: id.to_string(),
                state,
                operation: "enable",
            });
        }

        let veto = resolver::check(
            instance.descriptor(),
            &self.registry,
            self.services.as_ref(),
            DependencyScope::Enable,
        )
        .into_result();
        if let Err(e) = veto {
            tracing::warn!(addon = %id, error = %e, "Enable refused");
            return Err(e);
        }

        let slow_after = self.config.slow_hook_warning();
        let instance = self
            .registry
            .get_mut(id)
            .ok_or_else(|| AddonHostError::NotFound(id.to_string()))?;
        let staged = {
            let (addon, ctx) = instance.parts_mut();
            ctx.clear_staging();
            invoke_hook(addon, ctx, HookPhase::Enable, slow_after).and_then(|()| {
                match ctx.rejected_commands().first() {
                    Some(label) => Err(AddonHostError::NameCollision(label.clone())),
                    None => Ok(ctx.take_pending_commands()),
                }
            })
        };

        // ENABLED becomes visible before any command can be dispatched
        let committed = staged.and_then(|pending| {
            self.registry.set_state(id, AddonState::Enabled, None)?;
            self.commands.register_batch(Some(id), pending)?;
            Ok(())
        });

        match committed {
            Ok(()) => {
                tracing::info!(
                    addon = %id,
                    commands = self.commands.owned_by(id).len(),
                    "Addon enabled"
                );
                self.events.publish(LifecycleEvent::Enabled { id: id.to_string() });
                Ok(())
            }
            Err(e) => {
                self.commands.unregister_by_owner(id);
                if let Some(instance) = self.registry.get_mut(id) {
                    instance.context_mut().clear_staging();
                }
                self.fail(id, &e);
                Err(e)
            }
        }
    }

    /// ENABLED -> DISABLED.
    ///
    /// Every command owned by the addon is revoked after the hook returns,
    /// whatever the hook did. A failing hook moves the addon to FAILED.
    pub fn disable(&mut self, id: &str) -> Result<(), AddonHostError> {
        let mut visiting = HashSet::new();
        let cascade = self.config.cascade_disable;
        self.disable_inner(id, &mut visiting, cascade)
    }

    fn disable_inner(
        &mut self,
        id: &str,
        visiting: &mut HashSet<String>,
        cascade: bool,
    ) -> Result<(), AddonHostError> {
        let state = self
            .state(id)
            .ok_or_else(|| AddonHostError::NotFound(id.to_string()))?;
        if state != AddonState::Enabled {
            return Err(AddonHostError::InvalidState {
                id: id.to_string(),
                state,
                operation: "disable",
            });
        }

        visiting.insert(id.to_string());
        if cascade {
            self.disable_dependents(id, visiting);
        }

        let slow_after = self.config.slow_hook_warning();
        let instance = self
            .registry
            .get_mut(id)
            .ok_or_else(|| AddonHostError::NotFound(id.to_string()))?;
        let hook = {
            let (addon, ctx) = instance.parts_mut();
            invoke_hook(addon, ctx, HookPhase::Disable, slow_after)
        };
        discard_staged(instance.context_mut(), HookPhase::Disable);

        let removed = self.commands.unregister_by_owner(id);
        match hook {
            Ok(()) => {
                self.registry.set_state(id, AddonState::Disabled, None)?;
                tracing::info!(addon = %id, commands_removed = removed.len(), "Addon disabled");
                self.events.publish(LifecycleEvent::Disabled { id: id.to_string() });
                Ok(())
            }
            Err(e) => {
                self.fail(id, &e);
                Err(e)
            }
        }
    }

    /// Disable every ENABLED addon that depends on `id`, deepest first
    fn disable_dependents(&mut self, id: &str, visiting: &mut HashSet<String>) {
        let dependents: Vec<String> = self
            .registry
            .all_ids()
            .into_iter()
            .rev()
            .filter(|candidate| !visiting.contains(candidate))
            .filter(|candidate| {
                self.registry.get(candidate).is_some_and(|instance| {
                    instance.state() == AddonState::Enabled
                        && instance
                            .descriptor()
                            .addon_dependencies
                            .iter()
                            .any(|dep| dep == id)
                })
            })
            .collect();

        for dependent in dependents {
            if visiting.contains(&dependent) {
                continue;
            }
            tracing::info!(addon = %dependent, dependency = %id, "Cascading disable");
            if let Err(e) = self.disable_inner(&dependent, visiting, true) {
                tracing::warn!(addon = %dependent, error = %e, "Cascading disable failed");
            }
        }
    }

    /// Call the reload hook. State and commands are untouched; a failure is
    /// reported but never moves the addon to FAILED. FAILED addons are
    /// refused with `InvalidState`.
    pub fn reload(&mut self, id: &str) -> Result<(), AddonHostError> {
        let slow_after = self.config.slow_hook_warning();
        let instance = self
            .registry
            .get_mut(id)
            .ok_or_else(|| AddonHostError::NotFound(id.to_string()))?;
        let state = instance.state();
        if state == AddonState::Failed {
            return Err(AddonHostError::InvalidState {
                id: id.to_string(),
                state,
                operation: "reload",
            });
        }

        if let Err(e) = instance.context_mut().reload_config() {
            tracing::warn!(addon = %id, error = %e, "Addon config unreadable, keeping previous values");
        }
        let hook = {
            let (addon, ctx) = instance.parts_mut();
            invoke_hook(addon, ctx, HookPhase::Reload, slow_after)
        };
        discard_staged(instance.context_mut(), HookPhase::Reload);

        match hook {
            Ok(()) => {
                tracing::info!(addon = %id, "Addon reloaded");
                self.events.publish(LifecycleEvent::Reloaded { id: id.to_string() });
                Ok(())
            }
            Err(e) => {
                tracing::warn!(addon = %id, error = %e, "Addon reload failed, state unchanged");
                Err(e)
            }
        }
    }

    /// Remove an addon from the registry, disabling it first if ENABLED.
    ///
    /// Unload proceeds even when that disable fails.
    pub fn unload(&mut self, id: &str) -> Result<(), AddonHostError> {
        let state = self
            .state(id)
            .ok_or_else(|| AddonHostError::NotFound(id.to_string()))?;

        let mut visiting = HashSet::from([id.to_string()]);
        if self.config.cascade_disable {
            self.disable_dependents(id, &mut visiting);
        }
        if state == AddonState::Enabled {
            if let Err(e) = self.disable_inner(id, &mut visiting, false) {
                tracing::warn!(addon = %id, error = %e, "Disable before unload failed, unloading anyway");
            }
        }

        self.commands.unregister_by_owner(id);
        let instance = self
            .registry
            .remove(id)
            .ok_or_else(|| AddonHostError::NotFound(id.to_string()))?;
        // Instance first, then its library
        drop(instance);

        tracing::info!(addon = %id, "Addon unloaded");
        self.events.publish(LifecycleEvent::Unloaded { id: id.to_string() });
        Ok(())
    }

    fn fail(&mut self, id: &str, error: &AddonHostError) {
        let message = error.to_string();
        tracing::error!(addon = %id, error = %message, "Addon failed");
        let _ = self
            .registry
            .set_state(id, AddonState::Failed, Some(message.clone()));
        self.events.publish(LifecycleEvent::Failed {
            id: id.to_string(),
            error: message,
        });
    }

    // ─── Bulk Operations ─────────────────────────────────────────────

    /// Enable every LOADED or DISABLED addon, in registration order
    pub fn enable_all(&mut self) -> BulkOutcome {
        let mut outcome = BulkOutcome::default();
        for id in self.registry.all_ids() {
            if !matches!(
                self.state(&id),
                Some(AddonState::Loaded | AddonState::Disabled)
            ) {
                continue;
            }
            match self.enable(&id) {
                Ok(()) => outcome.succeeded.push(id),
                Err(e) => outcome.failed.push((id, e)),
            }
        }
        outcome
    }

    /// Disable every ENABLED addon, in reverse registration order
    pub fn disable_all(&mut self) -> BulkOutcome {
        let mut outcome = BulkOutcome::default();
        for id in self.registry.all_ids().into_iter().rev() {
            if self.state(&id) != Some(AddonState::Enabled) {
                continue;
            }
            match self.disable_inner(&id, &mut HashSet::new(), false) {
                Ok(()) => outcome.succeeded.push(id),
                Err(e) => outcome.failed.push((id, e)),
            }
        }
        outcome
    }

    /// Reload every registered addon that has not FAILED
    pub fn reload_all(&mut self) -> BulkOutcome {
        let mut outcome = BulkOutcome::default();
        for id in self.registry.all_ids() {
            if self.state(&id) == Some(AddonState::Failed) {
                continue;
            }
            match self.reload(&id) {
                Ok(()) => outcome.succeeded.push(id),
                Err(e) => outcome.failed.push((id, e)),
            }
        }
        outcome
    }

    /// Disable everything, then drop every command not owned by the host
    pub fn shutdown(&mut self) -> BulkOutcome {
        let outcome = self.disable_all();
        let dropped = self.commands.clear_addon_commands();
        tracing::info!(
            disabled = outcome.succeeded.len(),
            failed = outcome.failed.len(),
            stray_commands = dropped,
            "Addon host shut down"
        );
        outcome
    }

    // ─── Introspection ───────────────────────────────────────────────

    /// Every registered addon, failed artifact and untracked artifact,
    /// sorted by state then id
    pub fn list(&self) -> Vec<AddonInfo> {
        let mut infos: Vec<AddonInfo> = self
            .registry
            .iter()
            .map(|instance| self.info_for(instance))
            .collect();
        infos.extend(self.ledger.iter().map(AddonInfo::from_failure));

        match self.scanner().scan(&self.registry, &self.ledger) {
            Ok(discovery) => {
                for path in discovery.new {
                    let preview = read_manifest_file(&path, &self.config.manifest_file).ok();
                    infos.push(AddonInfo::unloaded(&path, preview));
                }
            }
            Err(e) => {
                tracing::warn!(dir = %self.config.addons_dir.display(), error = %e, "Could not scan addons directory");
            }
        }

        infos.sort_by(|a, b| a.state.cmp(&b.state).then_with(|| a.id.cmp(&b.id)));
        infos
    }

    /// Details of a registered addon, or of a failed artifact by id or name
    pub fn info(&self, id: &str) -> Result<AddonInfo, AddonHostError> {
        if let Some(instance) = self.registry.get(id) {
            return Ok(self.info_for(instance));
        }
        self.ledger
            .find(id)
            .map(AddonInfo::from_failure)
            .ok_or_else(|| AddonHostError::NotFound(id.to_string()))
    }

    fn info_for(&self, instance: &AddonInstance) -> AddonInfo {
        let mut info = AddonInfo::from_descriptor(instance.descriptor(), instance.state());
        info.artifact = instance.artifact();
        info.last_error = instance.last_error().map(str::to_string);
        info.commands = self.commands.owned_by(instance.id());
        info.loaded_at = Some(instance.loaded_at());
        info
    }
}

/// Call one lifecycle hook, converting errors and panics to `HookThrew`
fn invoke_hook(
    addon: &mut dyn Addon,
    ctx: &mut AddonContext,
    phase: HookPhase,
    slow_after: Duration,
) -> Result<(), AddonHostError> {
    let started = Instant::now();
    let result = std::panic::catch_unwind(AssertUnwindSafe(|| match phase {
        HookPhase::Load => addon.on_load(ctx),
        HookPhase::Enable => addon.on_enable(ctx),
        HookPhase::Disable => addon.on_disable(ctx),
        HookPhase::Reload => addon.on_reload(ctx),
    }));

    let elapsed = started.elapsed();
    if !slow_after.is_zero() && elapsed > slow_after {
        tracing::warn!(
            addon = %ctx.addon_id(),
            phase = %phase,
            elapsed_ms = elapsed.as_millis() as u64,
            "Slow addon hook"
        );
    }

    match result {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(AddonHostError::hook(phase, e.to_string())),
        Err(payload) => Err(AddonHostError::hook(
            phase,
            format!("panicked: {}", panic_message(payload.as_ref())),
        )),
    }
}

/// Commands may only be registered from `on_enable`
fn discard_staged(ctx: &mut AddonContext, phase: HookPhase) {
    let staged = ctx.pending_commands().len() + ctx.rejected_commands().len();
    if staged > 0 {
        tracing::warn!(
            addon = %ctx.addon_id(),
            phase = %phase,
            count = staged,
            "Commands registered outside on_enable were discarded"
        );
    }
    ctx.clear_staging();
}
