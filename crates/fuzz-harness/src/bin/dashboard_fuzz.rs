//! Dashboard Fuzz Runner CLI
//!
//! Usage:
//!   dashboard-fuzz run [--cases N] [--seed S] [--target NAME]... [--output results.json]
//!   dashboard-fuzz list
//!
//! Examples:
//!   dashboard-fuzz run                          # every target, 256 cases each
//!   dashboard-fuzz run --cases 100000 --seed 42
//!   dashboard-fuzz run --target geo_banding --output geo.json

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use fuzz_harness::runner::{FuzzConfig, FuzzRunner};
use fuzz_harness::targets::{run_target, TARGETS};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "dashboard-fuzz", about = "Property sweeps over the orbit dashboard core")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run fuzz targets and report the results
    Run {
        /// Cases per target
        #[arg(long, default_value_t = 256)]
        cases: u32,

        /// Random seed (0 = random)
        #[arg(long, default_value_t = 0)]
        seed: u64,

        /// Only run these targets
        #[arg(long = "target")]
        targets: Vec<String>,

        /// Write results as JSON
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// List available targets
    List,
}

fn main() -> Result<ExitCode> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    match Cli::parse().command {
        Command::List => {
            for name in TARGETS {
                println!("{}", name);
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Run {
            cases,
            seed,
            targets,
            output,
        } => {
            let config = FuzzConfig::new().cases(cases).seed(seed);
            info!("Fuzz runner: {} cases per target, seed {}", config.cases, config.seed);

            let selected: Vec<&str> = if targets.is_empty() {
                TARGETS.to_vec()
            } else {
                targets.iter().map(String::as_str).collect()
            };

            let mut runner = FuzzRunner::new(config);
            for name in &selected {
                if run_target(&mut runner, name).is_none() {
                    bail!("unknown target {} (see `dashboard-fuzz list`)", name);
                }
            }

            let passed = runner.results().iter().filter(|r| r.passed).count();
            info!("{}/{} targets passed", passed, runner.results().len());

            if let Some(path) = output {
                let json = runner.export_json()?;
                fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
                info!("Results written to {}", path.display());
            }

            Ok(if runner.all_passed() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
    }
}
