//! Lifecycle tests for AddonManager
//!
//! These drive artifacts on disk through discovery, load, enable, disable,
//! reload and unload using the compiled-in loader.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use addonhost_api::{
    Addon, AddonContext, AddonError, AddonState, CommandInvocation, CommandOutput,
    CommandRegistration, CommandSpec,
};
use addonhost_core::addons::{AddonDescriptor, AddonHostError, HookPhase};
use addonhost_core::operator;
use addonhost_core::{
    AddonHostConfig, AddonManager, CommandTable, LifecycleEvent, ServiceDirectory, StaticLoader,
};
use tempfile::TempDir;

/// Test addon registering a fixed set of commands on enable
#[derive(Default)]
struct Fixture {
    commands: Vec<&'static str>,
    fail_load: bool,
    panic_on_load: bool,
    fail_enable: bool,
    panic_on_enable: bool,
    fail_disable: bool,
    fail_reload: bool,
    reloads: Option<Arc<AtomicUsize>>,
}

impl Fixture {
    fn with_commands(commands: &[&'static str]) -> Self {
        Self {
            commands: commands.to_vec(),
            ..Self::default()
        }
    }
}

impl Addon for Fixture {
    fn on_load(&mut self, _ctx: &mut AddonContext) -> Result<(), AddonError> {
        if self.panic_on_load {
            panic!("load blew up");
        }
        if self.fail_load {
            return Err(AddonError::custom("missing schema"));
        }
        Ok(())
    }

    fn on_enable(&mut self, ctx: &mut AddonContext) -> Result<(), AddonError> {
        if self.panic_on_enable {
            panic!("enable blew up");
        }
        if self.fail_enable {
            return Err(AddonError::custom("not today"));
        }
        for name in &self.commands {
            let reply = format!("{} from {}", name, ctx.addon_id());
            ctx.register_command(
                CommandSpec::new(*name).description("test command"),
                move |_: &CommandInvocation| -> Result<CommandOutput, AddonError> {
                    Ok(CommandOutput::Text(reply.clone()))
                },
            )?;
        }
        Ok(())
    }

    fn on_disable(&mut self, _ctx: &mut AddonContext) -> Result<(), AddonError> {
        if self.fail_disable {
            return Err(AddonError::custom("disk full"));
        }
        Ok(())
    }

    fn on_reload(&mut self, _ctx: &mut AddonContext) -> Result<(), AddonError> {
        if let Some(reloads) = &self.reloads {
            reloads.fetch_add(1, Ordering::SeqCst);
        }
        if self.fail_reload {
            return Err(AddonError::custom("config corrupt"));
        }
        Ok(())
    }
}

fn boxed(addon: Fixture) -> Result<Box<dyn Addon>, AddonError> {
    Ok(Box::new(addon))
}

fn write_artifact(root: &TempDir, dir: &str, manifest: &str) {
    let path = root.path().join("addons").join(dir);
    std::fs::create_dir_all(&path).unwrap();
    std::fs::write(path.join("addon.toml"), manifest).unwrap();
}

fn config(root: &TempDir) -> AddonHostConfig {
    AddonHostConfig::with_dirs(root.path().join("addons"), root.path().join("data"))
}

fn manager_with(
    root: &TempDir,
    loader: StaticLoader,
    services: Arc<ServiceDirectory>,
) -> AddonManager {
    AddonManager::new(config(root), loader, services)
}

fn table_owners(manager: &AddonManager) -> Vec<Option<String>> {
    manager
        .commands()
        .entries()
        .into_iter()
        .map(|entry| entry.owner)
        .collect()
}

#[test]
fn colliding_derived_ids_keep_first_addon() {
    let root = TempDir::new().unwrap();
    write_artifact(&root, "stats-a", "name = \"Stats!!\"\nmain = \"stats\"\n");
    write_artifact(&root, "stats-b", "name = \"Stats!!\"\nmain = \"stats\"\n");
    let loader = StaticLoader::new().with("stats", |_| boxed(Fixture::with_commands(&["stats"])));
    let mut manager = manager_with(&root, loader, Arc::new(ServiceDirectory::new()));

    assert_eq!(manager.load_artifact("stats-a").unwrap(), "stats");
    manager.enable("stats").unwrap();

    let err = manager.load_artifact("stats-b").unwrap_err();
    assert!(matches!(err, AddonHostError::AlreadyRegistered(ref id) if id == "stats"));
    assert_eq!(manager.state("stats"), Some(AddonState::Enabled));
    assert_eq!(manager.commands().owned_by("stats"), vec!["stats"]);
    assert!(manager.ledger().contains("stats-b"));
    assert_eq!(
        manager.registry().get("stats").unwrap().artifact().as_deref(),
        Some("stats-a")
    );
}

#[test]
fn discovery_pass_reports_second_stats_artifact() {
    let root = TempDir::new().unwrap();
    write_artifact(&root, "one", "name = \"Stats!!\"\nmain = \"stats\"\n");
    write_artifact(&root, "two", "name = \"Stats!!\"\nmain = \"stats\"\n");
    let loader = StaticLoader::new().with("stats", |_| boxed(Fixture::default()));
    let mut manager = manager_with(&root, loader, Arc::new(ServiceDirectory::new()));

    let outcome = manager.load_new().unwrap();
    assert_eq!(outcome.succeeded, vec!["stats"]);
    assert_eq!(outcome.failed.len(), 1);
    let (artifact, err) = &outcome.failed[0];
    assert_eq!(artifact, "two");
    assert!(matches!(err, AddonHostError::AlreadyRegistered(id) if id == "stats"));
}

#[test]
fn enable_with_missing_addon_dependency_leaves_state_unchanged() {
    let root = TempDir::new().unwrap();
    write_artifact(&root, "core", "name = \"Core\"\nmain = \"core\"\n");
    write_artifact(
        &root,
        "shop",
        "name = \"Shop\"\nmain = \"shop\"\ndependencies = [\"core\"]\n",
    );
    let loader = StaticLoader::new()
        .with("core", |_| boxed(Fixture::default()))
        .with("shop", |_| boxed(Fixture::with_commands(&["shop"])));
    let mut manager = manager_with(&root, loader, Arc::new(ServiceDirectory::new()));

    manager.load_new().unwrap();
    manager.unload("core").unwrap();

    let err = manager.enable("shop").unwrap_err();
    assert!(matches!(err, AddonHostError::DependencyMissing(ref missing) if missing == &["core"]));
    assert_eq!(manager.state("shop"), Some(AddonState::Loaded));
    assert!(manager.commands().is_empty());
}

#[test]
fn load_refuses_missing_addon_dependency() {
    let root = TempDir::new().unwrap();
    write_artifact(
        &root,
        "shop",
        "name = \"Shop\"\nmain = \"shop\"\ndependencies = [\"core\"]\n",
    );
    let loader = StaticLoader::new().with("shop", |_| boxed(Fixture::default()));
    let mut manager = manager_with(&root, loader, Arc::new(ServiceDirectory::new()));

    let err = manager.load_artifact("shop").unwrap_err();
    assert!(matches!(err, AddonHostError::DependencyMissing(_)));
    assert!(manager.state("shop").is_none());
    assert!(manager.ledger().contains("shop"));
}

#[test]
fn disable_leaves_no_commands_owned_by_addon() {
    let root = TempDir::new().unwrap();
    write_artifact(&root, "bounty", "name = \"Bounty\"\nmain = \"bounty\"\n");
    let loader = StaticLoader::new().with("bounty", |_| {
        boxed(Fixture::with_commands(&["bounty", "bounties", "hunt"]))
    });
    let mut manager = manager_with(&root, loader, Arc::new(ServiceDirectory::new()));
    manager
        .commands()
        .register(
            None,
            CommandRegistration::new(
                CommandSpec::new("help"),
                |_: &CommandInvocation| -> Result<CommandOutput, AddonError> {
                    Ok(CommandOutput::Success)
                },
            ),
        )
        .unwrap();

    manager.load_new().unwrap();
    manager.enable("bounty").unwrap();
    assert_eq!(manager.commands().owned_by("bounty").len(), 3);

    manager.disable("bounty").unwrap();
    assert!(manager.commands().unregister_by_owner("bounty").is_empty());
    let owners = table_owners(&manager);
    assert!(!owners.contains(&Some("bounty".to_string())));
    // Host command survives
    assert_eq!(owners, vec![None]);
}

#[test]
fn enable_disable_enable_round_trip() {
    let root = TempDir::new().unwrap();
    write_artifact(
        &root,
        "greeter",
        "name = \"Greeter\"\nversion = \"1.2.0\"\nmain = \"greeter\"\n",
    );
    let loader = StaticLoader::new()
        .with("greeter", |_| boxed(Fixture::with_commands(&["greet", "wave"])));
    let mut manager = manager_with(&root, loader, Arc::new(ServiceDirectory::new()));

    manager.load_artifact("greeter").unwrap();
    let descriptor = manager.registry().get("greeter").unwrap().descriptor().clone();

    manager.enable("greeter").unwrap();
    let first = manager.commands().owned_by("greeter");
    manager.disable("greeter").unwrap();
    assert_eq!(manager.state("greeter"), Some(AddonState::Disabled));
    manager.enable("greeter").unwrap();

    assert_eq!(manager.state("greeter"), Some(AddonState::Enabled));
    assert_eq!(manager.commands().owned_by("greeter"), first);
    assert_eq!(
        manager.registry().get("greeter").unwrap().descriptor(),
        &descriptor
    );

    let invocation = CommandInvocation::parse("console", "/GREET").unwrap();
    assert_eq!(
        manager.commands().dispatch(&invocation).unwrap(),
        CommandOutput::Text("greet from greeter".to_string())
    );
}

#[test]
fn vault_service_gates_enable_but_not_load() {
    let root = TempDir::new().unwrap();
    write_artifact(
        &root,
        "econ",
        "id = \"econ-addon\"\nname = \"Economy\"\nmain = \"econ\"\ndependencies = []\nplugin-dependencies = [\"Vault\"]\n",
    );
    let services = Arc::new(ServiceDirectory::new());
    services.register("Vault", false);
    let loader = StaticLoader::new().with("econ", |_| boxed(Fixture::with_commands(&["pay"])));
    let mut manager = manager_with(&root, loader, services.clone());

    assert_eq!(manager.load_artifact("econ").unwrap(), "econ-addon");
    let err = manager.enable("econ-addon").unwrap_err();
    assert!(matches!(err, AddonHostError::DependencyMissing(ref missing) if missing == &["Vault"]));
    assert_eq!(manager.state("econ-addon"), Some(AddonState::Loaded));

    // Checked live: starting the service is enough
    services.start("Vault");
    manager.enable("econ-addon").unwrap();
    assert!(manager.commands().contains("pay"));
}

#[test]
fn failure_ledger_blocks_rescan_until_retry() {
    let root = TempDir::new().unwrap();
    write_artifact(&root, "broken", "name = \"Broken\"\n");
    let loader = StaticLoader::new().with("broken", |_| boxed(Fixture::default()));
    let mut manager = manager_with(&root, loader, Arc::new(ServiceDirectory::new()));

    let outcome = manager.load_new().unwrap();
    assert_eq!(outcome.failed.len(), 1);
    assert!(manager.ledger().contains("broken"));

    // Known-bad artifacts are not re-attempted by a plain scan
    write_artifact(&root, "broken", "name = \"Broken\"\nmain = \"broken\"\n");
    let outcome = manager.load_new().unwrap();
    assert!(outcome.succeeded.is_empty() && outcome.failed.is_empty());
    assert_eq!(manager.discover().unwrap().failed.len(), 1);

    assert_eq!(manager.load_artifact("broken").unwrap(), "broken");
    assert!(!manager.ledger().contains("broken"));
    assert!(matches!(
        manager.load_artifact("broken"),
        Err(AddonHostError::AlreadyTracked(_))
    ));
}

#[test]
fn loader_errors_are_recorded_with_preview() {
    let root = TempDir::new().unwrap();
    write_artifact(&root, "ghost", "name = \"Ghost\"\nmain = \"nowhere\"\n");
    let mut manager = manager_with(&root, StaticLoader::new(), Arc::new(ServiceDirectory::new()));

    manager.load_new().unwrap();
    let info = manager.info("ghost").unwrap();
    assert_eq!(info.state, AddonState::Failed);
    assert_eq!(info.artifact.as_deref(), Some("ghost"));
    assert!(info.last_error.unwrap().contains("nowhere"));
    assert!(info.failed_at.is_some());
}

#[test]
fn failing_load_hook_goes_to_ledger_only() {
    let root = TempDir::new().unwrap();
    write_artifact(&root, "refuse", "name = \"Refuse\"\nmain = \"refuse\"\n");
    write_artifact(&root, "wild", "name = \"Wild\"\nmain = \"wild\"\n");
    let loader = StaticLoader::new()
        .with("refuse", |_| {
            boxed(Fixture {
                fail_load: true,
                ..Fixture::default()
            })
        })
        .with("wild", |_| {
            boxed(Fixture {
                panic_on_load: true,
                ..Fixture::default()
            })
        });
    let mut manager = manager_with(&root, loader, Arc::new(ServiceDirectory::new()));

    let outcome = manager.load_new().unwrap();
    assert!(outcome.succeeded.is_empty());
    assert_eq!(outcome.failed.len(), 2);
    for (_, err) in &outcome.failed {
        assert!(matches!(err, AddonHostError::HookThrew { phase: HookPhase::Load, .. }));
    }

    assert!(manager.state("refuse").is_none());
    assert!(manager.state("wild").is_none());
    assert!(manager.registry().is_empty());
    assert!(manager.ledger().contains("refuse"));
    assert!(manager.ledger().contains("wild"));
    assert!(manager.info("wild").unwrap().last_error.unwrap().contains("load blew up"));
}

#[test]
fn unloaded_id_is_free_for_another_artifact() {
    let root = TempDir::new().unwrap();
    write_artifact(&root, "stats-a", "name = \"Stats\"\nmain = \"stats\"\n");
    write_artifact(&root, "stats-b", "name = \"Stats\"\nmain = \"stats\"\n");
    let loader = StaticLoader::new().with("stats", |_| boxed(Fixture::with_commands(&["stats"])));
    let mut manager = manager_with(&root, loader, Arc::new(ServiceDirectory::new()));

    assert_eq!(manager.load_artifact("stats-a").unwrap(), "stats");
    manager.enable("stats").unwrap();
    manager.unload("stats").unwrap();

    assert_eq!(manager.load_artifact("stats-b").unwrap(), "stats");
    assert!(manager.ledger().is_empty());
    assert_eq!(
        manager.registry().get("stats").unwrap().artifact().as_deref(),
        Some("stats-b")
    );
    manager.enable("stats").unwrap();
    assert_eq!(manager.commands().owned_by("stats"), vec!["stats"]);
}

#[test]
fn dependency_order_within_discovery_pass() {
    let root = TempDir::new().unwrap();
    // Sorted directory order puts the dependent first
    write_artifact(
        &root,
        "a-shop",
        "name = \"Shop\"\nmain = \"shop\"\ndependencies = [\"money\"]\n",
    );
    write_artifact(&root, "b-money", "name = \"Money\"\nmain = \"money\"\n");
    let loader = StaticLoader::new()
        .with("shop", |_| boxed(Fixture::default()))
        .with("money", |_| boxed(Fixture::default()));
    let mut manager = manager_with(&root, loader, Arc::new(ServiceDirectory::new()));

    let outcome = manager.load_new().unwrap();
    assert_eq!(outcome.succeeded, vec!["money", "shop"]);
    assert!(outcome.is_clean());
}

#[test]
fn command_collision_fails_second_addon_only() {
    let root = TempDir::new().unwrap();
    write_artifact(&root, "first", "name = \"First\"\nmain = \"first\"\n");
    write_artifact(&root, "second", "name = \"Second\"\nmain = \"second\"\n");
    let loader = StaticLoader::new()
        .with("first", |_| boxed(Fixture::with_commands(&["top"])))
        .with("second", |_| boxed(Fixture::with_commands(&["mine", "top"])));
    let mut manager = manager_with(&root, loader, Arc::new(ServiceDirectory::new()));
    manager.load_new().unwrap();

    manager.enable("first").unwrap();
    let err = manager.enable("second").unwrap_err();
    assert!(matches!(err, AddonHostError::HookThrew { phase: HookPhase::Enable, .. }));

    assert_eq!(manager.state("second"), Some(AddonState::Failed));
    assert!(manager.commands().owned_by("second").is_empty());
    assert!(!manager.commands().contains("mine"));
    assert_eq!(manager.commands().owned_by("first"), vec!["top"]);
}

#[test]
fn panicking_enable_hook_fails_addon() {
    let root = TempDir::new().unwrap();
    write_artifact(&root, "wild", "name = \"Wild\"\nmain = \"wild\"\n");
    let loader = StaticLoader::new().with("wild", |_| {
        boxed(Fixture {
            panic_on_enable: true,
            ..Fixture::default()
        })
    });
    let mut manager = manager_with(&root, loader, Arc::new(ServiceDirectory::new()));
    manager.load_new().unwrap();

    let err = manager.enable("wild").unwrap_err();
    assert!(err.to_string().contains("enable blew up"));
    assert_eq!(manager.state("wild"), Some(AddonState::Failed));

    // FAILED leaves only through unload
    manager.unload("wild").unwrap();
    assert!(manager.state("wild").is_none());
}

#[test]
fn failing_disable_hook_still_revokes_commands() {
    let root = TempDir::new().unwrap();
    write_artifact(&root, "sticky", "name = \"Sticky\"\nmain = \"sticky\"\n");
    let loader = StaticLoader::new().with("sticky", |_| {
        boxed(Fixture {
            commands: vec!["glue"],
            fail_disable: true,
            ..Fixture::default()
        })
    });
    let mut manager = manager_with(&root, loader, Arc::new(ServiceDirectory::new()));
    manager.load_new().unwrap();
    manager.enable("sticky").unwrap();

    let err = manager.disable("sticky").unwrap_err();
    assert!(matches!(err, AddonHostError::HookThrew { phase: HookPhase::Disable, .. }));
    assert_eq!(manager.state("sticky"), Some(AddonState::Failed));
    assert!(manager.commands().is_empty());
}

#[test]
fn reload_keeps_state_and_commands() {
    let root = TempDir::new().unwrap();
    write_artifact(&root, "notes", "name = \"Notes\"\nmain = \"notes\"\n");
    let reloads = Arc::new(AtomicUsize::new(0));
    let counter = reloads.clone();
    let loader = StaticLoader::new().with("notes", move |_| {
        boxed(Fixture {
            commands: vec!["note"],
            reloads: Some(counter.clone()),
            ..Fixture::default()
        })
    });
    let mut manager = manager_with(&root, loader, Arc::new(ServiceDirectory::new()));
    manager.load_new().unwrap();
    manager.enable("notes").unwrap();

    manager.reload("notes").unwrap();
    assert!(manager.reload_all().is_clean());

    assert_eq!(reloads.load(Ordering::SeqCst), 2);
    assert_eq!(manager.state("notes"), Some(AddonState::Enabled));
    assert_eq!(manager.commands().owned_by("notes"), vec!["note"]);
}

#[test]
fn failing_reload_hook_keeps_state_and_commands() {
    let root = TempDir::new().unwrap();
    write_artifact(&root, "notes", "name = \"Notes\"\nmain = \"notes\"\n");
    let loader = StaticLoader::new().with("notes", |_| {
        boxed(Fixture {
            commands: vec!["note", "notes"],
            fail_reload: true,
            ..Fixture::default()
        })
    });
    let mut manager = manager_with(&root, loader, Arc::new(ServiceDirectory::new()));
    manager.load_new().unwrap();
    manager.enable("notes").unwrap();
    let before = manager.commands().owned_by("notes");
    let mut events = manager.subscribe();

    let err = manager.reload("notes").unwrap_err();
    assert!(matches!(err, AddonHostError::HookThrew { phase: HookPhase::Reload, .. }));
    assert!(err.to_string().contains("config corrupt"));
    assert_eq!(manager.state("notes"), Some(AddonState::Enabled));
    assert_eq!(manager.commands().owned_by("notes"), before);
    assert!(events.try_recv().is_err());

    let outcome = manager.reload_all();
    assert_eq!(outcome.failed.len(), 1);
    assert_eq!(manager.state("notes"), Some(AddonState::Enabled));
}

#[test]
fn reload_refuses_failed_addon() {
    let root = TempDir::new().unwrap();
    write_artifact(&root, "flaky", "name = \"Flaky\"\nmain = \"flaky\"\n");
    let reloads = Arc::new(AtomicUsize::new(0));
    let counter = reloads.clone();
    let loader = StaticLoader::new().with("flaky", move |_| {
        boxed(Fixture {
            fail_enable: true,
            reloads: Some(counter.clone()),
            ..Fixture::default()
        })
    });
    let mut manager = manager_with(&root, loader, Arc::new(ServiceDirectory::new()));
    manager.load_new().unwrap();
    assert!(manager.enable("flaky").is_err());
    assert_eq!(manager.state("flaky"), Some(AddonState::Failed));

    let err = manager.reload("flaky").unwrap_err();
    assert!(matches!(
        err,
        AddonHostError::InvalidState { operation: "reload", state: AddonState::Failed, .. }
    ));
    let reply = operator::execute(&mut manager, &["reload", "flaky"]);
    assert!(!reply.success, "{}", reply.message);

    assert_eq!(reloads.load(Ordering::SeqCst), 0);
    assert_eq!(manager.state("flaky"), Some(AddonState::Failed));
}

#[test]
fn cascade_disable_walks_dependents_first() {
    let root = TempDir::new().unwrap();
    write_artifact(&root, "base", "name = \"Base\"\nmain = \"base\"\n");
    write_artifact(
        &root,
        "mid",
        "name = \"Mid\"\nmain = \"mid\"\ndependencies = [\"base\"]\n",
    );
    write_artifact(
        &root,
        "top",
        "name = \"Top\"\nmain = \"top\"\ndependencies = [\"mid\"]\n",
    );
    let loader = StaticLoader::new()
        .with("base", |_| boxed(Fixture::with_commands(&["b"])))
        .with("mid", |_| boxed(Fixture::with_commands(&["m"])))
        .with("top", |_| boxed(Fixture::with_commands(&["t"])));
    let mut cfg = config(&root);
    cfg.cascade_disable = true;
    let mut manager = AddonManager::new(cfg, loader, Arc::new(ServiceDirectory::new()));
    manager.load_new().unwrap();
    assert!(manager.enable_all().is_clean());

    let mut events = manager.subscribe();
    manager.disable("base").unwrap();

    let order: Vec<String> = std::iter::from_fn(|| events.try_recv().ok())
        .map(|event| event.id().to_string())
        .collect();
    assert_eq!(order, vec!["top", "mid", "base"]);
    assert!(manager.commands().is_empty());
}

#[test]
fn without_cascade_dependents_stay_enabled() {
    let root = TempDir::new().unwrap();
    write_artifact(&root, "base", "name = \"Base\"\nmain = \"base\"\n");
    write_artifact(
        &root,
        "mid",
        "name = \"Mid\"\nmain = \"mid\"\ndependencies = [\"base\"]\n",
    );
    let loader = StaticLoader::new()
        .with("base", |_| boxed(Fixture::default()))
        .with("mid", |_| boxed(Fixture::default()));
    let mut manager = manager_with(&root, loader, Arc::new(ServiceDirectory::new()));
    manager.load_new().unwrap();
    manager.enable_all();

    manager.disable("base").unwrap();
    assert_eq!(manager.state("mid"), Some(AddonState::Enabled));
}

#[test]
fn lifecycle_events_are_broadcast() {
    let root = TempDir::new().unwrap();
    write_artifact(&root, "echo", "name = \"Echo\"\nmain = \"echo\"\n");
    let loader = StaticLoader::new().with("echo", |_| boxed(Fixture::default()));
    let mut manager = manager_with(&root, loader, Arc::new(ServiceDirectory::new()));
    let mut events = manager.subscribe();

    manager.load_new().unwrap();
    manager.enable("echo").unwrap();
    manager.reload("echo").unwrap();
    manager.unload("echo").unwrap();

    let received: Vec<LifecycleEvent> = std::iter::from_fn(|| events.try_recv().ok()).collect();
    let id = || "echo".to_string();
    assert_eq!(
        received,
        vec![
            LifecycleEvent::Loaded { id: id() },
            LifecycleEvent::Enabled { id: id() },
            LifecycleEvent::Reloaded { id: id() },
            LifecycleEvent::Disabled { id: id() },
            LifecycleEvent::Unloaded { id: id() },
        ]
    );
}

#[test]
fn list_covers_registered_failed_and_untracked() {
    let root = TempDir::new().unwrap();
    write_artifact(&root, "good", "name = \"Good\"\nmain = \"good\"\n");
    write_artifact(&root, "bad", "name = \"Bad\"\n");
    let loader = StaticLoader::new().with("good", |_| boxed(Fixture::default()));
    let mut manager = manager_with(&root, loader, Arc::new(ServiceDirectory::new()));
    manager.load_new().unwrap();
    write_artifact(&root, "later", "name = \"Later\"\nmain = \"later\"\n");
    manager
        .register_builtin(AddonDescriptor::builtin("Core Tools", "1.0"), Box::new(Fixture::default()))
        .unwrap();

    let listed: Vec<(String, AddonState)> = manager
        .list()
        .into_iter()
        .map(|info| (info.id, info.state))
        .collect();
    assert_eq!(
        listed,
        vec![
            ("later".to_string(), AddonState::Unloaded),
            ("core-tools".to_string(), AddonState::Loaded),
            ("good".to_string(), AddonState::Loaded),
            ("bad".to_string(), AddonState::Failed),
        ]
    );
}

#[test]
fn shutdown_disables_everything() {
    let root = TempDir::new().unwrap();
    write_artifact(&root, "one", "name = \"One\"\nmain = \"one\"\n");
    write_artifact(&root, "two", "name = \"Two\"\nmain = \"two\"\n");
    let loader = StaticLoader::new()
        .with("one", |_| boxed(Fixture::with_commands(&["uno"])))
        .with("two", |_| boxed(Fixture::with_commands(&["dos"])));
    let mut manager = manager_with(&root, loader, Arc::new(ServiceDirectory::new()));
    manager.load_new().unwrap();
    manager.enable_all();

    let outcome = manager.shutdown();
    assert_eq!(outcome.succeeded, vec!["two", "one"]);
    assert!(manager.commands().is_empty());
    assert_eq!(manager.state("one"), Some(AddonState::Disabled));
}

#[test]
fn shared_table_keeps_host_commands_through_lifecycle() {
    let root = TempDir::new().unwrap();
    write_artifact(&root, "one", "name = \"One\"\nmain = \"one\"\n");
    let loader = StaticLoader::new().with("one", |_| boxed(Fixture::with_commands(&["uno"])));
    let table = Arc::new(CommandTable::new());
    table
        .register(
            None,
            CommandRegistration::new(
                CommandSpec::new("help").alias("?"),
                |_: &CommandInvocation| -> Result<CommandOutput, AddonError> {
                    Ok(CommandOutput::Text("host help".to_string()))
                },
            ),
        )
        .unwrap();
    let mut manager = manager_with(&root, loader, Arc::new(ServiceDirectory::new()))
        .with_command_table(table.clone());

    manager.load_new().unwrap();
    manager.enable("one").unwrap();
    assert!(table.contains("uno"));
    assert_eq!(table.len(), 2);

    manager.disable("one").unwrap();
    assert!(!table.contains("uno"));
    manager.enable("one").unwrap();
    manager.shutdown();

    assert_eq!(table.len(), 1);
    assert_eq!(table.lookup("?").unwrap().owner, None);
    let invocation = CommandInvocation::parse("console", "help").unwrap();
    assert_eq!(
        table.dispatch(&invocation).unwrap(),
        CommandOutput::Text("host help".to_string())
    );
}

#[test]
fn operator_surface_drives_manager() {
    let root = TempDir::new().unwrap();
    write_artifact(&root, "greeter", "name = \"Greeter\"\nmain = \"greeter\"\n");
    let loader = StaticLoader::new().with("greeter", |_| boxed(Fixture::with_commands(&["greet"])));
    let mut manager = manager_with(&root, loader, Arc::new(ServiceDirectory::new()));

    let reply = operator::execute(&mut manager, &["scan"]);
    assert!(reply.success, "{}", reply.message);
    assert!(reply.message.contains("1 loaded"));

    assert!(operator::execute(&mut manager, &["enable", "greeter"]).success);
    let info = operator::execute(&mut manager, &["info", "greeter"]);
    assert!(info.message.contains("State: ENABLED"));
    assert!(info.message.contains("Commands: greet"));

    let reply = operator::execute(&mut manager, &["enable", "greeter"]);
    assert!(!reply.success);

    let reply = operator::execute(&mut manager, &["unload", "nobody"]);
    assert!(!reply.success);
    assert!(reply.message.contains("nobody"));

    assert!(operator::execute(&mut manager, &["unload", "greeter"]).success);
    let listing = operator::execute(&mut manager, &["list"]);
    assert!(listing.message.contains("[UNLOADED] greeter"));
}

#[test]
fn addon_data_dir_lives_under_data_root() {
    let root = TempDir::new().unwrap();
    let manager = manager_with(&root, StaticLoader::new(), Arc::new(ServiceDirectory::new()));
    let expected = root.path().join("data").join("addons").join("stats");
    assert_eq!(manager.host_handle().addon_data_dir("stats"), expected);
    assert!(!expected.exists());
}
