//! Concurrency tests for the command table
//!
//! These validate that dispatch threads never run a handler whose owner has
//! already left ENABLED, while a control thread toggles the owner:
//! - Disable waits for in-flight handlers before the state changes
//! - Enable publishes ENABLED before any command becomes reachable

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use addonhost_api::{
    Addon, AddonContext, AddonError, CommandInvocation, CommandOutput, CommandSpec,
};
use addonhost_core::{
    AddonDescriptor, AddonHostConfig, AddonManager, DispatchError, ServiceDirectory, StaticLoader,
};
use tempfile::TempDir;

/// Counts every handler run that observed a non-ENABLED owner
struct Watched {
    stale: Arc<AtomicUsize>,
    handled: Arc<AtomicUsize>,
}

impl Addon for Watched {
    fn on_enable(&mut self, ctx: &mut AddonContext) -> Result<(), AddonError> {
        let status = ctx.status();
        let stale = self.stale.clone();
        let handled = self.handled.clone();
        ctx.register_command(
            CommandSpec::new("probe").alias("p"),
            move |_: &CommandInvocation| -> Result<CommandOutput, AddonError> {
                if !status.is_enabled() {
                    stale.fetch_add(1, Ordering::SeqCst);
                }
                // Widen the window for a racing disable
                thread::sleep(Duration::from_micros(50));
                if !status.is_enabled() {
                    stale.fetch_add(1, Ordering::SeqCst);
                }
                handled.fetch_add(1, Ordering::SeqCst);
                Ok(CommandOutput::Success)
            },
        )
    }

    fn on_disable(&mut self, _ctx: &mut AddonContext) -> Result<(), AddonError> {
        Ok(())
    }
}

fn watched_manager(
    root: &TempDir,
    stale: Arc<AtomicUsize>,
    handled: Arc<AtomicUsize>,
) -> AddonManager {
    let config = AddonHostConfig::with_dirs(root.path().join("addons"), root.path().join("data"));
    let mut manager = AddonManager::new(
        config,
        StaticLoader::new(),
        Arc::new(ServiceDirectory::new()),
    );
    manager
        .register_builtin(
            AddonDescriptor::builtin("Watched", "1"),
            Box::new(Watched { stale, handled }),
        )
        .unwrap();
    manager
}

#[test]
fn dispatch_never_observes_disabled_owner() {
    let root = TempDir::new().unwrap();
    let stale = Arc::new(AtomicUsize::new(0));
    let handled = Arc::new(AtomicUsize::new(0));
    let mut manager = watched_manager(&root, stale.clone(), handled.clone());
    manager.enable("watched").unwrap();

    let table = manager.commands().clone();
    let stop = Arc::new(AtomicBool::new(false));
    let readers: Vec<_> = (0..4)
        .map(|n| {
            let table = table.clone();
            let stop = stop.clone();
            thread::spawn(move || {
                let label = if n % 2 == 0 { "probe" } else { "P" };
                let invocation = CommandInvocation::new("console", label, Vec::new());
                while !stop.load(Ordering::SeqCst) {
                    match table.dispatch(&invocation) {
                        // Revoked between toggles
                        Ok(_) | Err(DispatchError::UnknownCommand(_)) => {}
                        Err(e) => panic!("unexpected dispatch error: {}", e),
                    }
                }
            })
        })
        .collect();

    for _ in 0..200 {
        manager.disable("watched").unwrap();
        thread::yield_now();
        manager.enable("watched").unwrap();
        thread::yield_now();
    }
    let deadline = Instant::now() + Duration::from_secs(5);
    while handled.load(Ordering::SeqCst) == 0 && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(1));
    }
    stop.store(true, Ordering::SeqCst);

    for reader in readers {
        reader.join().unwrap();
    }

    assert_eq!(stale.load(Ordering::SeqCst), 0);
    assert!(handled.load(Ordering::SeqCst) > 0);
    assert_eq!(manager.commands().owned_by("watched"), vec!["probe"]);
}

#[test]
fn lookups_see_all_or_none_of_an_addons_commands() {
    struct Many;

    impl Addon for Many {
        fn on_enable(&mut self, ctx: &mut AddonContext) -> Result<(), AddonError> {
            for name in ["alpha", "beta", "gamma", "delta"] {
                ctx.register_command(
                    CommandSpec::new(name),
                    |_: &CommandInvocation| -> Result<CommandOutput, AddonError> {
                        Ok(CommandOutput::Success)
                    },
                )?;
            }
            Ok(())
        }

        fn on_disable(&mut self, _ctx: &mut AddonContext) -> Result<(), AddonError> {
            Ok(())
        }
    }

    let root = TempDir::new().unwrap();
    let config = AddonHostConfig::with_dirs(root.path().join("addons"), root.path().join("data"));
    let mut manager = AddonManager::new(
        config,
        StaticLoader::new(),
        Arc::new(ServiceDirectory::new()),
    );
    manager
        .register_builtin(AddonDescriptor::builtin("Many", "1"), Box::new(Many))
        .unwrap();

    let table = manager.commands().clone();
    let stop = Arc::new(AtomicBool::new(false));
    let torn = Arc::new(AtomicUsize::new(0));
    let reader = {
        let stop = stop.clone();
        let torn = torn.clone();
        thread::spawn(move || {
            while !stop.load(Ordering::SeqCst) {
                let owned = table.owned_by("many").len();
                if owned != 0 && owned != 4 {
                    torn.fetch_add(1, Ordering::SeqCst);
                }
            }
        })
    };

    for _ in 0..200 {
        manager.enable("many").unwrap();
        manager.disable("many").unwrap();
    }
    stop.store(true, Ordering::SeqCst);
    reader.join().unwrap();

    assert_eq!(torn.load(Ordering::SeqCst), 0);
    assert!(manager.commands().is_empty());
}
