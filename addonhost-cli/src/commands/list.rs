//! List addon artifacts without loading them

use std::sync::Arc;

use addonhost_api::AddonState;
use addonhost_core::{AddonInfo, AddonManager, NativeLoader, ServiceDirectory};
use anyhow::Result;
use clap::Args;

use super::HostArgs;
use crate::config::ConfigLoader;

#[derive(Args)]
pub struct ListArgs {
    #[command(flatten)]
    pub host: HostArgs,

    /// Print JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: ListArgs) -> Result<()> {
    let config = args.host.apply(ConfigLoader::load()?);
    let services = Arc::new(ServiceDirectory::with_services(config.services.enabled));
    let manager = AddonManager::new(config.addons, NativeLoader, services);

    // Nothing is loaded: every artifact shows up with its manifest preview
    let discovery = manager.discover()?;
    tracing::debug!(artifacts = discovery.total(), "Discovery complete");
    let infos = manager.list();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&infos)?);
        return Ok(());
    }

    if infos.is_empty() {
        let dir = manager.config().addons_dir.display();
        println!("No addons installed");
        println!();
        println!("Addons directory: {}", dir);
        println!();
        println!("To install an addon:");
        println!("  1. Create an artifact directory: mkdir -p {}/my-addon", dir);
        println!("  2. Add the manifest: {}/my-addon/addon.toml", dir);
        println!(
            "  3. Copy the library: cp libmy_addon.so {}/my-addon/",
            dir
        );
        return Ok(());
    }

    for info in &infos {
        println!("{}", format_row(info));
    }
    Ok(())
}

fn format_row(info: &AddonInfo) -> String {
    let marker = match info.state {
        AddonState::Failed => "✗",
        AddonState::Unloaded => "○",
        _ => "✓",
    };
    let detail = info
        .last_error
        .as_deref()
        .or(info.description.as_deref())
        .unwrap_or("No description");
    format!(
        "{} {} v{} [{}]    {}",
        marker,
        info.id,
        info.version,
        info.artifact.as_deref().unwrap_or("built-in"),
        detail
    )
}
