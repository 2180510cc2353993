//! Command types for addon registration and dispatch

use crate::error::AddonError;
use std::fmt;
use std::sync::Arc;

/// Specification for a command an addon (or the host) registers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// Primary command name, stored lower-case
    pub name: String,
    /// Short description for help text
    pub description: String,
    /// Usage string, `/<name>` unless set
    pub usage: String,
    /// Alternative names, each unique in the host's table
    pub aliases: Vec<String>,
}

impl CommandSpec {
    /// Create a spec with default description and usage
    pub fn new(name: impl Into<String>) -> Self {
        let name = normalize_name(&name.into());
        Self {
            usage: format!("/{}", name),
            name,
            description: String::new(),
            aliases: Vec::new(),
        }
    }

    /// Builder: set the description
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Builder: set the usage string
    pub fn usage(mut self, usage: impl Into<String>) -> Self {
        self.usage = usage.into();
        self
    }

    /// Builder: add an alias
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(normalize_name(&alias.into()));
        self
    }

    /// Primary name followed by every alias
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.aliases.iter().map(String::as_str))
    }

    /// Check the primary name and aliases are non-empty single words
    pub fn validate(&self) -> Result<(), AddonError> {
        for label in self.labels() {
            if label.is_empty() || label.chars().any(char::is_whitespace) {
                return Err(AddonError::InvalidCommandName(label.to_string()));
            }
        }
        Ok(())
    }
}

/// Normalize a command label: trimmed and lower-case
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// A single command invocation arriving on the dispatch path
#[derive(Debug, Clone, Default)]
pub struct CommandInvocation {
    /// Who issued the command (player name, "console", ...)
    pub sender: String,
    /// The label used, either the primary name or an alias
    pub label: String,
    /// Whitespace-separated arguments after the label
    pub args: Vec<String>,
}

impl CommandInvocation {
    /// Create an invocation from a label and arguments
    pub fn new(sender: impl Into<String>, label: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            sender: sender.into(),
            label: label.into(),
            args,
        }
    }

    /// Parse a command line like `bounty place Steve 100`.
    ///
    /// A leading `/` is stripped. Returns `None` for blank lines.
    pub fn parse(sender: impl Into<String>, line: &str) -> Option<Self> {
        let line = line.trim();
        let line = line.strip_prefix('/').unwrap_or(line);
        let mut parts = line.split_whitespace();
        let label = parts.next()?;
        Some(Self::new(
            sender,
            label,
            parts.map(str::to_string).collect(),
        ))
    }
}

/// Output from a command handler
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutput {
    /// Text for the sender
    Text(String),
    /// Handled, nothing to print
    Success,
    /// The arguments were wrong; the caller should show the usage string
    Usage,
}

/// Handler invoked when a registered command is dispatched.
///
/// Handlers run on dispatch threads, possibly concurrently with each other.
/// They must not register or unregister commands.
pub trait CommandHandler: Send + Sync {
    /// Execute the command
    fn execute(&self, invocation: &CommandInvocation) -> Result<CommandOutput, AddonError>;

    /// Suggest completions for the last argument
    fn complete(&self, _invocation: &CommandInvocation) -> Vec<String> {
        Vec::new()
    }
}

impl<F> CommandHandler for F
where
    F: Fn(&CommandInvocation) -> Result<CommandOutput, AddonError> + Send + Sync,
{
    fn execute(&self, invocation: &CommandInvocation) -> Result<CommandOutput, AddonError> {
        self(invocation)
    }
}

/// A command spec paired with its handler
#[derive(Clone)]
pub struct CommandRegistration {
    /// Metadata and names
    pub spec: CommandSpec,
    /// The handler behind every label of the spec
    pub handler: Arc<dyn CommandHandler>,
}

impl CommandRegistration {
    /// Pair a spec with a handler
    pub fn new(spec: CommandSpec, handler: impl CommandHandler + 'static) -> Self {
        Self {
            spec,
            handler: Arc::new(handler),
        }
    }
}

impl fmt::Debug for CommandRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandRegistration")
            .field("spec", &self.spec)
            .finish_non_exhaustive()
    }
}
