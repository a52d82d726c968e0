#![warn(clippy::manual_let_else)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::wildcard_imports)]

use anyhow::Result;
use clap::Parser;
use svcmgr_manager::config_loader::ConfigLoader;
use svcmgr_manager::{HostContext, ServiceManager};
use tracing_subscriber::EnvFilter;

mod cli;
mod handlers;
mod shell;
mod style;

use cli::{Cli, Commands};

/// Variable read for the log filter before `RUST_LOG`.
const LOG_ENV: &str = "SVCMGR_LOG";

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = std::env::var(LOG_ENV)
        .ok()
        .and_then(|v| EnvFilter::try_new(v).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new(default));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let loader = ConfigLoader::load(cli.root_dir.clone())?;
    tracing::debug!("Using configuration from {}", loader.source);

    let manager = ServiceManager::load(HostContext::from_config(loader.config))?;
    let mut app = handlers::App::new(manager);

    match &cli.command {
        Commands::Shell => shell::run(&mut app, std::io::stdin().lock()),
        command => app.run(command),
    }
}
