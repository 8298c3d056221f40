use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use common_proxies::EnvironmentFault;
use market_sim::SimulatedMarket;
use scenario_engine::{
    loader::{DirectorySource, ScenarioSource},
    runner::parse_selection,
    RunConfiguration, ScenarioRunner,
};

/// Runs lending-market scenario files against the simulated market and
/// checks every step with the calculation oracle.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Run configuration (TOML).
    #[arg(long, default_value = "runner/config.toml")]
    config: PathBuf,

    /// Directory holding the scenario files.
    #[arg(long, default_value = "scenarios")]
    scenarios: PathBuf,

    /// Comma-separated scenario ids to run, with or without `.json`; all when empty.
    #[arg(long, default_value = "")]
    only: String,

    /// Enforce revert expectations only.
    #[arg(long)]
    skip_integrity_check: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    let mut config = match RunConfiguration::load(&args.config) {
        Ok(config) => config,
        Err(error) => {
            log::error!("{error}");
            return ExitCode::FAILURE;
        },
    };
    config.skip_integrity_check |= args.skip_integrity_check;

    let loaded = match DirectorySource::new(&args.scenarios).load(&parse_selection(&args.only)) {
        Ok(loaded) => loaded,
        Err(error) => {
            log::error!("{error}");
            return ExitCode::FAILURE;
        },
    };

    let runner = match ScenarioRunner::new(config) {
        Ok(runner) => runner,
        Err(error) => {
            log::error!("{error}");
            return ExitCode::FAILURE;
        },
    };

    let mut report = runner.run(&loaded.registry, new_market).await;
    report.definition_failures.extend(loaded.failures);
    report.log_summary();

    if report.passed() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn new_market(config: &RunConfiguration) -> Result<SimulatedMarket, EnvironmentFault> {
    SimulatedMarket::new(&config.reserves).map_err(|error| EnvironmentFault::Transient {
        reason: format!("cannot list reserves: {error}"),
    })
}
