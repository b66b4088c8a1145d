//! Runs every harness experiment and prints the report as JSON.
//!
//! Logging is controlled with `RUST_LOG` (e.g. `RUST_LOG=selector_core=debug`)
//! and goes to stderr, so stdout carries only the report.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use selector_core::harness::{run_all, HarnessConfig, HarnessError};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Parser)]
#[command(name = "selector-bench", about = "selector re-render and timing experiments", long_about = None)]
struct CliArgs {
    /// JSON harness config; every field is optional.
    #[arg(short = 'c', long = "config", value_name = "PATH")]
    config: Option<PathBuf>,

    /// Override the simulation seed.
    #[arg(long)]
    seed: Option<u64>,
}

impl CliArgs {
    fn load_config(&self) -> Result<HarnessConfig, HarnessError> {
        let mut config = match &self.config {
            Some(path) => {
                info!(path = %path.display(), "loading harness config");
                HarnessConfig::load(path)?
            }
            None => HarnessConfig::default(),
        };
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        Ok(config)
    }
}

fn run(args: &CliArgs) -> Result<(), HarnessError> {
    let config = args.load_config()?;
    let report = run_all(&config)?;
    println!("{}", report.to_json()?);
    Ok(())
}

fn main() -> ExitCode {
    let args = CliArgs::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}
