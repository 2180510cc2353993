//! Command table shared by the host and its enabled addons
//!
//! One table maps every primary name and alias to its handler. Mutations
//! take the write lock only for the insert or removal itself. Dispatch holds
//! the read lock for the whole handler call, so an owner's revocation
//! returns only after every in-flight handler of that owner has finished.
//! A handler may query [`CommandNamespace::is_taken`] but must not mutate
//! the table; any write from inside a handler deadlocks.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use thiserror::Error;

use addonhost_api::command::normalize_name;
use addonhost_api::{
    AddonError, CommandHandler, CommandInvocation, CommandNamespace, CommandOutput,
    CommandRegistration, CommandSpec,
};

use crate::addons::error::{AddonHostError, panic_message};

/// Errors from mutating the command table
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandTableError {
    /// A primary name or alias is already registered
    #[error("Command name already registered: {0}")]
    NameCollision(String),

    /// A label is empty or contains whitespace
    #[error("Invalid command name: '{0}'")]
    InvalidName(String),

    #[error("Command '{0}' not found")]
    NotFound(String),

    /// Host-owned commands cannot be removed by name
    #[error("Command '{0}' belongs to the host")]
    HostOwned(String),
}

impl From<CommandTableError> for AddonHostError {
    fn from(err: CommandTableError) -> Self {
        match err {
            CommandTableError::NameCollision(name) => AddonHostError::NameCollision(name),
            other => AddonHostError::InvalidCommand(other.to_string()),
        }
    }
}

/// Errors from dispatching a command
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Command '{command}' failed: {error}")]
    Handler { command: String, error: AddonError },

    #[error("Command '{command}' panicked: {message}")]
    HandlerPanicked { command: String, message: String },
}

/// Public view of a table entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandInfo {
    pub spec: CommandSpec,
    /// Owning addon id; `None` for host commands
    pub owner: Option<String>,
}

struct Entry {
    spec: CommandSpec,
    owner: Option<String>,
    handler: Arc<dyn CommandHandler>,
}

impl Entry {
    fn info(&self) -> CommandInfo {
        CommandInfo {
            spec: self.spec.clone(),
            owner: self.owner.clone(),
        }
    }
}

#[derive(Default)]
struct Table {
    /// Primary name -> entry
    entries: HashMap<String, Entry>,
    /// Every label (primary names and aliases) -> primary name
    labels: HashMap<String, String>,
}

impl Table {
    fn resolve(&self, label: &str) -> Option<&Entry> {
        let primary = self.labels.get(&normalize_name(label))?;
        self.entries.get(primary)
    }

    /// Remove an entry and all of its labels
    fn remove(&mut self, primary: &str) -> Option<Entry> {
        let entry = self.entries.remove(primary)?;
        for label in entry.spec.labels() {
            self.labels.remove(label);
        }
        Some(entry)
    }

    fn remove_where(&mut self, mut predicate: impl FnMut(&Entry) -> bool) -> Vec<String> {
        let doomed: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| predicate(entry))
            .map(|(name, _)| name.clone())
            .collect();
        for name in &doomed {
            self.remove(name);
        }
        doomed
    }
}

/// The shared command table
#[derive(Default)]
pub struct CommandTable {
    inner: RwLock<Table>,
}

impl CommandTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one command. `owner` is `None` for host commands.
    pub fn register(
        &self,
        owner: Option<&str>,
        registration: CommandRegistration,
    ) -> Result<(), CommandTableError> {
        self.register_batch(owner, vec![registration])
    }

    /// Register a batch of commands under one owner, all or nothing.
    ///
    /// Fails closed: if any name or alias collides with the table or another
    /// member of the batch, nothing is inserted.
    pub fn register_batch(
        &self,
        owner: Option<&str>,
        registrations: Vec<CommandRegistration>,
    ) -> Result<(), CommandTableError> {
        for registration in &registrations {
            registration
                .spec
                .validate()
                .map_err(|_| invalid_name(&registration.spec))?;
        }

        let mut table = self.inner.write();
        let mut claimed: Vec<&str> = Vec::new();
        for registration in &registrations {
            for label in registration.spec.labels() {
                if table.labels.contains_key(label) || claimed.contains(&label) {
                    return Err(CommandTableError::NameCollision(label.to_string()));
                }
                claimed.push(label);
            }
        }

        for registration in registrations {
            let primary = registration.spec.name.clone();
            for label in registration.spec.labels() {
                table.labels.insert(label.to_string(), primary.clone());
            }
            table.entries.insert(
                primary,
                Entry {
                    spec: registration.spec,
                    owner: owner.map(str::to_string),
                    handler: registration.handler,
                },
            );
        }
        Ok(())
    }

    /// Remove every command owned by `owner`. Host commands are never touched.
    ///
    /// Returns the removed primary names, sorted.
    pub fn unregister_by_owner(&self, owner: &str) -> Vec<String> {
        let mut removed = self
            .inner
            .write()
            .remove_where(|entry| entry.owner.as_deref() == Some(owner));
        removed.sort();
        removed
    }

    /// Remove a single addon-owned command (by primary name or alias) and all
    /// of its aliases
    pub fn unregister_by_name(&self, name: &str) -> Result<CommandInfo, CommandTableError> {
        let mut table = self.inner.write();
        let primary = match table.resolve(name) {
            None => return Err(CommandTableError::NotFound(normalize_name(name))),
            Some(entry) if entry.owner.is_none() => {
                return Err(CommandTableError::HostOwned(entry.spec.name.clone()));
            }
            Some(entry) => entry.spec.name.clone(),
        };
        table
            .remove(&primary)
            .map(|entry| entry.info())
            .ok_or(CommandTableError::NotFound(primary))
    }

    /// Remove every addon-owned command, keeping host commands
    pub fn clear_addon_commands(&self) -> usize {
        self.inner
            .write()
            .remove_where(|entry| entry.owner.is_some())
            .len()
    }

    /// Look up a command by primary name or alias
    pub fn lookup(&self, label: &str) -> Option<CommandInfo> {
        self.inner.read().resolve(label).map(Entry::info)
    }

    /// Run the handler behind `invocation.label`.
    ///
    /// The handler runs under the read lock; it must not call back into the
    /// table.
    pub fn dispatch(&self, invocation: &CommandInvocation) -> Result<CommandOutput, DispatchError> {
        let table = self.inner.read();
        let entry = table
            .resolve(&invocation.label)
            .ok_or_else(|| DispatchError::UnknownCommand(invocation.label.clone()))?;

        let result =
            std::panic::catch_unwind(AssertUnwindSafe(|| entry.handler.execute(invocation)));
        match result {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(error)) => Err(DispatchError::Handler {
                command: entry.spec.name.clone(),
                error,
            }),
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                tracing::error!(
                    command = %entry.spec.name,
                    owner = ?entry.owner,
                    error = %message,
                    "Command handler panicked"
                );
                Err(DispatchError::HandlerPanicked {
                    command: entry.spec.name.clone(),
                    message,
                })
            }
        }
    }

    /// Tab-completion suggestions for `invocation`; empty when unknown
    pub fn complete(&self, invocation: &CommandInvocation) -> Vec<String> {
        let table = self.inner.read();
        let Some(entry) = table.resolve(&invocation.label) else {
            return Vec::new();
        };
        std::panic::catch_unwind(AssertUnwindSafe(|| entry.handler.complete(invocation)))
            .unwrap_or_default()
    }

    /// Every entry, sorted by primary name
    pub fn entries(&self) -> Vec<CommandInfo> {
        let table = self.inner.read();
        let mut entries: Vec<CommandInfo> = table.entries.values().map(Entry::info).collect();
        entries.sort_by(|a, b| a.spec.name.cmp(&b.spec.name));
        entries
    }

    /// Primary names owned by `owner`, sorted
    pub fn owned_by(&self, owner: &str) -> Vec<String> {
        let table = self.inner.read();
        let mut names: Vec<String> = table
            .entries
            .values()
            .filter(|entry| entry.owner.as_deref() == Some(owner))
            .map(|entry| entry.spec.name.clone())
            .collect();
        names.sort();
        names
    }

    /// Whether a primary name or alias is registered
    pub fn contains(&self, label: &str) -> bool {
        self.inner
            .read()
            .labels
            .contains_key(&normalize_name(label))
    }

    /// Number of primary commands
    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().entries.is_empty()
    }
}

impl CommandNamespace for CommandTable {
    /// Takes a recursive read so a handler running under `dispatch` can ask
    /// while a writer is queued
    fn is_taken(&self, label: &str) -> bool {
        self.inner
            .read_recursive()
            .labels
            .contains_key(&normalize_name(label))
    }

    fn release(&self, owner: &str, name: &str) -> bool {
        let mut table = self.inner.write();
        let primary = match table.resolve(name) {
            Some(entry) if entry.owner.as_deref() == Some(owner) => entry.spec.name.clone(),
            _ => return false,
        };
        table.remove(&primary).is_some()
    }
}

fn invalid_name(spec: &CommandSpec) -> CommandTableError {
    let label = spec
        .labels()
        .find(|label| label.is_empty() || label.chars().any(char::is_whitespace))
        .unwrap_or(&spec.name);
    CommandTableError::InvalidName(label.to_string())
}
