//! Hello Addon - A simple example addon for addonhost
//!
//! This addon demonstrates:
//! - Exporting an entry point with the `export_addons!` macro
//! - Implementing the `Addon` trait
//! - Registering commands from `on_enable`
//! - Persisting a counter in the addon's config file
//!
//! ## Building
//!
//! ```bash
//! cargo build --release
//! ```
//!
//! ## Installing
//!
//! ```bash
//! mkdir -p ~/.config/addonhost/addons/hello
//! cp addon.toml ~/.config/addonhost/addons/hello/
//! cp target/release/libhello_addon.so ~/.config/addonhost/addons/hello/hello.so
//! addonhost run
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use addonhost_api::{
    Addon, AddonContext, AddonError, CommandInvocation, CommandOutput, CommandSpec, HostHandle,
    export_addons,
};

const DEFAULT_GREETING: &str = "Hello";

/// Greets whoever asks and remembers how many greetings it has handed out.
#[derive(Default)]
pub struct HelloAddon {
    greeted: Arc<AtomicU64>,
    greeting: Arc<RwLock<String>>,
}

impl HelloAddon {
    fn create(_host: HostHandle) -> Result<Box<dyn Addon>, AddonError> {
        Ok(Box::new(Self::default()))
    }

    fn read_config(&self, ctx: &AddonContext) {
        let greeting = ctx
            .config_get::<String>("greeting")
            .unwrap_or_else(|| DEFAULT_GREETING.to_string());
        *self.greeting.write().unwrap_or_else(|e| e.into_inner()) = greeting;
        self.greeted.store(
            ctx.config_get::<u64>("greeted").unwrap_or(0),
            Ordering::SeqCst,
        );
    }
}

impl Addon for HelloAddon {
    fn on_load(&mut self, ctx: &mut AddonContext) -> Result<(), AddonError> {
        ctx.config_mut()
            .apply_defaults([("greeting", DEFAULT_GREETING)])?;
        self.read_config(ctx);
        ctx.log_info("Hello addon loaded!");
        Ok(())
    }

    fn on_enable(&mut self, ctx: &mut AddonContext) -> Result<(), AddonError> {
        let greeted = self.greeted.clone();
        let greeting = self.greeting.clone();
        ctx.register_command(
            CommandSpec::new("hello")
                .alias("hi")
                .description("Say hello")
                .usage("/hello <name>"),
            move |inv: &CommandInvocation| -> Result<CommandOutput, AddonError> {
                let Some(name) = inv.args.first() else {
                    return Ok(CommandOutput::Usage);
                };
                let count = greeted.fetch_add(1, Ordering::SeqCst) + 1;
                let phrase = greeting.read().unwrap_or_else(|e| e.into_inner());
                Ok(CommandOutput::Text(format!(
                    "{}, {}! (greeting #{})",
                    phrase, name, count
                )))
            },
        )?;

        let greeted = self.greeted.clone();
        ctx.register_command(
            CommandSpec::new("greetings").description("How many greetings so far"),
            move |_: &CommandInvocation| -> Result<CommandOutput, AddonError> {
                Ok(CommandOutput::Text(format!(
                    "{} greeting(s) handed out",
                    greeted.load(Ordering::SeqCst)
                )))
            },
        )
    }

    fn on_disable(&mut self, ctx: &mut AddonContext) -> Result<(), AddonError> {
        ctx.config_set("greeted", self.greeted.load(Ordering::SeqCst))?;
        ctx.save_config()
    }

    fn on_reload(&mut self, ctx: &mut AddonContext) -> Result<(), AddonError> {
        self.read_config(ctx);
        ctx.log_info("Hello addon reloaded its config");
        Ok(())
    }
}

// This macro generates the declaration symbol the host's native loader reads
export_addons!("hello" => HelloAddon::create);
