use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use tracing::info;

use sluss_config::{validate_structure, ScenarioFile};
use sluss_core::{PfsApi, UdcApi};
use sluss_engine::{Collaborators, ScenarioRunner};
use sluss_sim::{SimConfig, SimNetwork};

#[derive(Parser)]
#[command(name = "sluss", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Execute a scenario against the simulated payment-channel network
    Run(RunArgs),
    /// Parse and validate a scenario without executing it
    Check(CheckArgs),
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Scenario fixture (YAML)
    pub scenario: PathBuf,
    /// Override the scenario's poll interval
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub poll_interval_ms: Option<u64>,
    /// Override the scenario's per-task timeout
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout_ms: Option<u64>,
    /// Artificial per-request latency in the simulated network
    #[arg(long, default_value_t = 0)]
    pub latency_ms: u64,
}

#[derive(Args, Debug, Clone)]
pub struct CheckArgs {
    /// Scenario fixture (YAML)
    pub scenario: PathBuf,
}

pub async fn run_scenario(args: RunArgs) -> anyhow::Result<ExitCode> {
    let mut scenario = ScenarioFile::load_from_path(&args.scenario)?;
    if let Some(ms) = args.poll_interval_ms {
        scenario.settings.poll_interval_ms = ms;
    }
    if let Some(ms) = args.timeout_ms {
        scenario.settings.task_timeout_ms = ms;
    }

    let sim = SimNetwork::new(
        scenario.nodes.count,
        SimConfig {
            latency: Duration::from_millis(args.latency_ms),
            block_time: scenario.settings.block_time(),
            ..SimConfig::default()
        },
    );
    let pfs: Arc<dyn PfsApi> = sim.clone();
    let udc: Arc<dyn UdcApi> = sim.clone();
    let collaborators = Collaborators {
        rpc: sim.clone(),
        process: sim.clone(),
        chain: sim.chain(),
        pfs: Some(pfs),
        udc: Some(udc),
    };
    info!(scenario = %args.scenario.display(), nodes = scenario.nodes.count, "running scenario");

    let report = ScenarioRunner::new(collaborators).run(&scenario).await?;
    print!("{report}");
    Ok(if report.passed {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

pub fn check_scenario(args: CheckArgs) -> anyhow::Result<ExitCode> {
    let scenario = ScenarioFile::load_from_path(&args.scenario)?;
    validate_structure(&scenario)?;
    println!(
        "{}: ok ({} node(s), {} task(s))",
        args.scenario.display(),
        scenario.nodes.count,
        scenario.scenario.leaf_count()
    );
    Ok(ExitCode::SUCCESS)
}
