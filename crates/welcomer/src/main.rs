//! Player Welcomer - standalone runner
//!
//! Loads the configuration, restores the welcomed-player ledger and drives
//! the welcome system from console commands until `quit` or a termination
//! signal.

mod cli;
mod console;
mod logging;
mod providers;
mod signals;

use anyhow::{Context, Result};
use cli::CliArgs;
use console::{Console, ConsoleHost};
use providers::LocalRewardSystems;
use std::sync::Arc;
use tracing::{error, info};
use welcome_system::{FileConfigLoader, JsonLedgerStorage, WelcomeSystem, WelcomerConfig};

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();

    // Load configuration first (before logging setup)
    let mut config = WelcomerConfig::load_from_file(&args.config_path)
        .await
        .with_context(|| format!("Failed to load {}", args.config_path.display()))?;

    if let Some(log_level) = args.log_level {
        config.logging.level = log_level;
    }
    if args.json_logs {
        config.logging.json_format = true;
    }
    logging::setup_logging(&config.logging)?;

    info!("🚀 Player Welcomer v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "📂 Config: {} | Data: {}",
        args.config_path.display(),
        config.data.path.display()
    );

    let rewards = LocalRewardSystems::default();
    let storage = Arc::new(JsonLedgerStorage::new(config.data.path.clone()));
    let loader = Arc::new(FileConfigLoader::new(args.config_path.clone()));
    let system = WelcomeSystem::start(
        config,
        loader,
        rewards.providers(),
        Arc::new(ConsoleHost),
        storage,
    )
    .await
    .context("Failed to start the welcome system")?;

    // The economy comes up after the welcome system, like a late plugin
    system.ledger_hook().register(rewards.economy.clone());
    system.dispatcher().log_availability();

    let console = Console::new(&system, rewards);
    println!("Type 'help' for a list of commands.");

    // The ledger is saved below however the session ended
    match signals::run_until_stopped(console.run(tokio::io::stdin())).await {
        Ok(reason) => info!("🛑 Shutting down ({})", reason),
        Err(e) => error!("❌ {:#}; shutting down", e),
    }

    drop(console);
    system
        .shutdown()
        .await
        .context("Failed to save the welcomed-player ledger")?;

    Ok(())
}
