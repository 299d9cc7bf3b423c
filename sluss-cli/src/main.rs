//! ## sluss-cli
//! **Scenario runner entrypoint**
//!
//! Loads a YAML scenario fixture, executes its task tree against the
//! in-memory simulated network, and reports the verdict. Exit status is
//! non-zero when any task fails.

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

mod commands;

use commands::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => commands::run_scenario(args).await,
        Commands::Check(args) => commands::check_scenario(args),
    }
}
