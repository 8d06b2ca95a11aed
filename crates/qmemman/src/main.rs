use anyhow::Result;
use clap::Parser;

mod check_cmd;
mod cli;
mod plan_cmd;
mod snapshot;

use cli::{Cli, Commands};
use qmemman_core::QmemmanConfig;

fn main() -> Result<()> {
    // Initialize tracing (output to stderr, initialize only once)
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init()
        .ok();

    let cli = Cli::parse();
    let config = QmemmanConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Balance { snapshot } => {
            plan_cmd::handle_balance(&snapshot, &config.policy, cli.format)
        }
        Commands::Balloon { snapshot, bytes } => {
            plan_cmd::handle_balloon(&snapshot, bytes, &config.policy, cli.format)
        }
        Commands::CheckMeminfo { path } => check_cmd::handle_check_meminfo(&path, cli.format),
    }
}
