//! Operator command surface: `addon <verb> [arg]`
//!
//! Every verb has a permission node `addonhost.addon.<verb>`. Each call
//! returns a definite [`OperatorReply`]; nothing is silently dropped.

use std::collections::HashSet;

use crate::addons::{AddonInfo, AddonManager, BulkOutcome};

/// Permission node prefix for operator commands
pub const PERMISSION_BASE: &str = "addonhost.addon";

/// Verb, argument synopsis and one-line description, in help order
const VERBS: &[(&str, &str, &str)] = &[
    ("list", "", "Show every addon and artifact with its state"),
    ("info", "<id>", "Show an addon's details and last error"),
    ("load", "<artifact>", "Load (or retry) an artifact by directory name"),
    ("scan", "", "Discover and load new artifacts"),
    ("enable", "<id>", "Enable a loaded or disabled addon"),
    ("disable", "<id>", "Disable an enabled addon"),
    ("reload", "[id]", "Reload one addon, or all when omitted"),
    ("unload", "<id>", "Disable if needed and remove an addon"),
];

/// A parsed operator command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperatorCommand {
    Help,
    List,
    Info(String),
    Load(String),
    Scan,
    Enable(String),
    Disable(String),
    Reload(Option<String>),
    Unload(String),
}

impl OperatorCommand {
    /// Parse `args` (the words after `addon`). `Err` carries a usage message.
    pub fn parse(args: &[&str]) -> Result<Self, String> {
        let Some((verb, rest)) = args.split_first() else {
            return Ok(Self::Help);
        };
        let verb = verb.to_lowercase();
        let arg = rest.first().map(|a| a.to_string());

        let required = |arg: Option<String>| arg.ok_or_else(|| usage(&verb));
        let command = match verb.as_str() {
            "help" => Self::Help,
            "list" => Self::List,
            "scan" => Self::Scan,
            "info" => Self::Info(required(arg)?),
            "load" => Self::Load(required(arg)?),
            "enable" => Self::Enable(required(arg)?),
            "disable" => Self::Disable(required(arg)?),
            "unload" => Self::Unload(required(arg)?),
            "reload" => Self::Reload(arg),
            other => return Err(format!("Unknown subcommand '{}'. Try 'addon help'.", other)),
        };
        Ok(command)
    }

    pub fn verb(&self) -> &'static str {
        match self {
            Self::Help => "help",
            Self::List => "list",
            Self::Info(_) => "info",
            Self::Load(_) => "load",
            Self::Scan => "scan",
            Self::Enable(_) => "enable",
            Self::Disable(_) => "disable",
            Self::Reload(_) => "reload",
            Self::Unload(_) => "unload",
        }
    }

    /// Permission node required to run this command; help needs none
    pub fn permission(&self) -> Option<String> {
        match self {
            Self::Help => None,
            other => Some(permission_node(other.verb())),
        }
    }
}

/// `addonhost.addon.<verb>`
pub fn permission_node(verb: &str) -> String {
    format!("{}.{}", PERMISSION_BASE, verb)
}

fn usage(verb: &str) -> String {
    let synopsis = VERBS
        .iter()
        .find(|(name, _, _)| *name == verb)
        .map(|(_, synopsis, _)| *synopsis)
        .unwrap_or("");
    format!("Usage: addon {} {}", verb, synopsis).trim_end().to_string()
}

/// Outcome of an operator command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperatorReply {
    pub success: bool,
    pub message: String,
}

impl OperatorReply {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// Grants permission nodes to the caller of an operator command
pub trait PermissionCheck {
    fn has_permission(&self, node: &str) -> bool;
}

/// Grants everything (the console)
#[derive(Debug, Default, Clone, Copy)]
pub struct AllowAll;

impl PermissionCheck for AllowAll {
    fn has_permission(&self, _node: &str) -> bool {
        true
    }
}

/// A set of granted nodes; `addonhost.addon.*` grants every verb
impl PermissionCheck for HashSet<String> {
    fn has_permission(&self, node: &str) -> bool {
        self.contains(node) || self.contains(&format!("{}.*", PERMISSION_BASE))
    }
}

/// Run an operator command with every permission
pub fn execute(manager: &mut AddonManager, args: &[&str]) -> OperatorReply {
    execute_as(manager, args, &AllowAll)
}

/// Run an operator command after checking the caller's permissions
pub fn execute_as(
    manager: &mut AddonManager,
    args: &[&str],
    permissions: &dyn PermissionCheck,
) -> OperatorReply {
    let command = match OperatorCommand::parse(args) {
        Ok(command) => command,
        Err(message) => return OperatorReply::fail(message),
    };

    if let Some(node) = command.permission() {
        if !permissions.has_permission(&node) {
            tracing::warn!(permission = %node, "Operator command denied");
            return OperatorReply::fail(format!("You do not have permission ({})", node));
        }
    }

    tracing::debug!(verb = command.verb(), "Operator command");
    run(manager, command, permissions)
}

fn run(
    manager: &mut AddonManager,
    command: OperatorCommand,
    permissions: &dyn PermissionCheck,
) -> OperatorReply {
    match command {
        OperatorCommand::Help => help(permissions),
        OperatorCommand::List => {
            let infos = manager.list();
            if infos.is_empty() {
                return OperatorReply::ok("No addons found.");
            }
            let lines: Vec<String> = infos.iter().map(summary_line).collect();
            OperatorReply::ok(format!("Addons ({}):\n{}", infos.len(), lines.join("\n")))
        }
        OperatorCommand::Info(id) => match manager.info(&id) {
            Ok(info) => OperatorReply::ok(details(&info)),
            Err(e) => OperatorReply::fail(e.to_string()),
        },
        OperatorCommand::Load(artifact) => match manager.load_artifact(&artifact) {
            Ok(id) => OperatorReply::ok(format!(
                "Loaded '{}' from {}. Use 'addon enable {}' to enable it.",
                id, artifact, id
            )),
            Err(e) => OperatorReply::fail(format!("Failed to load {}: {}", artifact, e)),
        },
        OperatorCommand::Scan => match manager.load_new() {
            Ok(outcome) => bulk_reply("Scan", "loaded", &outcome),
            Err(e) => OperatorReply::fail(format!("Scan failed: {}", e)),
        },
        OperatorCommand::Enable(id) => match manager.enable(&id) {
            Ok(()) => OperatorReply::ok(format!("Enabled '{}'", id)),
            Err(e) => OperatorReply::fail(format!("Failed to enable {}: {}", id, e)),
        },
        OperatorCommand::Disable(id) => match manager.disable(&id) {
            Ok(()) => OperatorReply::ok(format!("Disabled '{}'", id)),
            Err(e) => OperatorReply::fail(format!("Failed to disable {}: {}", id, e)),
        },
        OperatorCommand::Reload(Some(id)) => match manager.reload(&id) {
            Ok(()) => OperatorReply::ok(format!("Reloaded '{}'", id)),
            Err(e) => OperatorReply::fail(format!("Failed to reload {}: {}", id, e)),
        },
        OperatorCommand::Reload(None) => bulk_reply("Reload", "reloaded", &manager.reload_all()),
        OperatorCommand::Unload(id) => match manager.unload(&id) {
            Ok(()) => OperatorReply::ok(format!("Unloaded '{}'", id)),
            Err(e) => OperatorReply::fail(format!("Failed to unload {}: {}", id, e)),
        },
    }
}

fn help(permissions: &dyn PermissionCheck) -> OperatorReply {
    let lines: Vec<String> = VERBS
        .iter()
        .filter(|(verb, _, _)| permissions.has_permission(&permission_node(verb)))
        .map(|(verb, synopsis, description)| {
            let invocation = format!("addon {} {}", verb, synopsis);
            format!("  {:<24} {}", invocation.trim_end(), description)
        })
        .collect();

    if lines.is_empty() {
        return OperatorReply::fail("You do not have permission to manage addons.");
    }
    OperatorReply::ok(format!("Addon commands:\n{}", lines.join("\n")))
}

fn bulk_reply(operation: &str, verb: &str, outcome: &BulkOutcome) -> OperatorReply {
    let mut message = format!(
        "{} complete: {} {}, {} failed",
        operation,
        outcome.succeeded.len(),
        verb,
        outcome.failed.len()
    );
    for (id, error) in &outcome.failed {
        message.push_str(&format!("\n  {}: {}", id, error));
    }
    OperatorReply {
        success: outcome.is_clean(),
        message,
    }
}

fn summary_line(info: &AddonInfo) -> String {
    let mut line = format!("  [{}] {} v{}", info.state, info.id, info.version);
    if let Some(artifact) = &info.artifact {
        line.push_str(&format!(" ({})", artifact));
    }
    if let Some(error) = &info.last_error {
        line.push_str(&format!(" - {}", error));
    }
    line
}

fn details(info: &AddonInfo) -> String {
    let none = || "none".to_string();
    let mut lines = vec![
        format!("{} ({})", info.name, info.id),
        format!("  State: {}", info.state),
        format!("  Version: {}", info.version),
        format!("  Authors: {}", info.authors.join(", ")),
    ];
    if let Some(description) = &info.description {
        lines.push(format!("  Description: {}", description));
    }
    lines.push(format!(
        "  Artifact: {}",
        info.artifact.clone().unwrap_or_else(|| "built-in".to_string())
    ));
    let join = |values: &[String]| {
        if values.is_empty() {
            none()
        } else {
            values.join(", ")
        }
    };
    lines.push(format!("  Dependencies: {}", join(&info.addon_dependencies)));
    lines.push(format!(
        "  Service dependencies: {}",
        join(&info.host_service_dependencies)
    ));
    lines.push(format!("  Commands: {}", join(&info.commands)));
    if let Some(loaded_at) = info.loaded_at {
        lines.push(format!("  Loaded at: {}", loaded_at.to_rfc3339()));
    }
    if let Some(failed_at) = info.failed_at {
        lines.push(format!("  Failed at: {}", failed_at.to_rfc3339()));
    }
    if let Some(error) = &info.last_error {
        lines.push(format!("  Last error: {}", error));
    }
    lines.join("\n")
}
