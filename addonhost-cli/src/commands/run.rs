//! Run an interactive extension host on stdin

use std::sync::Arc;

use addonhost_api::{CommandInvocation, CommandOutput};
use addonhost_core::{
    AddonManager, BulkOutcome, DispatchError, LifecycleEvent, NativeLoader, ServiceDirectory,
    operator,
};
use anyhow::Result;
use clap::Args;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;

use super::HostArgs;
use crate::config::ConfigLoader;

const CONSOLE: &str = "console";

#[derive(Args)]
pub struct RunArgs {
    #[command(flatten)]
    pub host: HostArgs,
}

pub async fn run(args: RunArgs) -> Result<()> {
    let config = args.host.apply(ConfigLoader::load()?);
    let services = Arc::new(ServiceDirectory::with_services(
        config.services.enabled.iter().cloned(),
    ));
    let manager = AddonManager::new(config.addons, NativeLoader, services.clone());
    let watcher = tokio::spawn(log_events(manager.subscribe()));

    let mut shell = HostShell::new(manager, services);
    println!("{}", shell.start());
    println!("Type 'addon help' for addon commands, 'quit' to exit.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match shell.handle_line(&line) {
            LineOutcome::Reply(Some(text)) => println!("{}", text),
            LineOutcome::Reply(None) => {}
            LineOutcome::Quit => break,
        }
    }

    println!("{}", shell.stop());
    // Dropping the manager closes the event channel
    drop(shell);
    let _ = watcher.await;
    Ok(())
}

async fn log_events(mut events: broadcast::Receiver<LifecycleEvent>) {
    loop {
        match events.recv().await {
            Ok(event) => match serde_json::to_string(&event) {
                Ok(json) => tracing::debug!(addon = %event.id(), event = %json, "Lifecycle event"),
                Err(e) => tracing::warn!(error = %e, "Failed to encode lifecycle event"),
            },
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Lifecycle event watcher lagged");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

/// What to do after one input line
#[derive(Debug, PartialEq, Eq)]
pub enum LineOutcome {
    /// Print the reply, if any, and keep reading
    Reply(Option<String>),
    Quit,
}

/// The host's line interpreter: operator commands, service toggles and
/// command dispatch
pub struct HostShell {
    manager: AddonManager,
    services: Arc<ServiceDirectory>,
}

impl HostShell {
    pub fn new(manager: AddonManager, services: Arc<ServiceDirectory>) -> Self {
        Self { manager, services }
    }

    /// Load every new artifact and enable everything that loaded
    pub fn start(&mut self) -> String {
        let loaded = match self.manager.load_new() {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(error = %e, "Discovery failed");
                return format!("Discovery failed: {}", e);
            }
        };
        let enabled = self.manager.enable_all();
        format!(
            "{}\n{}",
            summarize("Loaded", &loaded),
            summarize("Enabled", &enabled)
        )
    }

    /// Disable every addon
    pub fn stop(&mut self) -> String {
        summarize("Disabled", &self.manager.shutdown())
    }

    pub fn handle_line(&mut self, line: &str) -> LineOutcome {
        let line = line.trim();
        let mut words = line.split_whitespace();
        let reply = match words.next() {
            None => None,
            Some("quit" | "exit") => return LineOutcome::Quit,
            Some("addon") => {
                let args: Vec<&str> = words.collect();
                Some(operator::execute(&mut self.manager, &args).message)
            }
            Some("service") => Some(self.service(&words.collect::<Vec<_>>())),
            Some(_) => self.dispatch(line),
        };
        LineOutcome::Reply(reply)
    }

    fn service(&self, args: &[&str]) -> String {
        match args {
            ["start", name] => {
                if self.services.start(name) {
                    tracing::info!(service = %name, "Service started");
                    format!("Service '{}' started", name)
                } else {
                    format!("Service '{}' is already running", name)
                }
            }
            ["stop", name] => {
                if self.services.stop(name) {
                    tracing::info!(service = %name, "Service stopped");
                    format!("Service '{}' stopped", name)
                } else {
                    format!("Service '{}' is not running", name)
                }
            }
            ["list"] | [] => {
                let services = self.services.list();
                if services.is_empty() {
                    return "No host services".to_string();
                }
                services
                    .into_iter()
                    .map(|(name, enabled)| {
                        format!("  {} ({})", name, if enabled { "running" } else { "stopped" })
                    })
                    .collect::<Vec<_>>()
                    .join("\n")
            }
            _ => "Usage: service start|stop <name> | service list".to_string(),
        }
    }

    fn dispatch(&self, line: &str) -> Option<String> {
        let invocation = CommandInvocation::parse(CONSOLE, line)?;
        let commands = self.manager.commands();
        match commands.dispatch(&invocation) {
            Ok(CommandOutput::Text(text)) => Some(text),
            Ok(CommandOutput::Success) => None,
            Ok(CommandOutput::Usage) => commands
                .lookup(&invocation.label)
                .map(|info| format!("Usage: {}", info.spec.usage)),
            Err(DispatchError::UnknownCommand(label)) => Some(format!(
                "Unknown command '{}'. Type 'addon help' for addon commands.",
                label
            )),
            Err(e) => {
                tracing::warn!(command = %invocation.label, error = %e, "Command failed");
                Some(e.to_string())
            }
        }
    }
}

fn summarize(verb: &str, outcome: &BulkOutcome) -> String {
    let mut text = format!("{} {} addon(s)", verb, outcome.succeeded.len());
    if !outcome.failed.is_empty() {
        text.push_str(&format!(", {} failed:", outcome.failed.len()));
        for (id, error) in &outcome.failed {
            text.push_str(&format!("\n  {}: {}", id, error));
        }
    }
    text
}
