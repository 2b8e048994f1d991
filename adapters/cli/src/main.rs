#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs a gridwalk scenario headlessly.

mod report;
mod scenario;
mod simulation;

use std::{path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::{report::Report, scenario::Scenario, simulation::Simulation};

#[derive(Debug, Parser)]
#[command(
    name = "gridwalk",
    about = "Runs a tile-movement scenario and reports the final state",
    version
)]
struct Cli {
    /// Path to a TOML scenario file.
    scenario: PathBuf,
    /// Number of frames to simulate; overrides the scenario.
    #[arg(long)]
    frames: Option<u32>,
    /// Frame length in milliseconds; overrides the scenario.
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    frame_ms: Option<u64>,
    /// Print the report as JSON.
    #[arg(long)]
    json: bool,
    /// Tracing filter such as `debug` or `gridwalk_world=trace`; defaults to RUST_LOG.
    #[arg(long)]
    log: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log.as_deref())?;

    let scenario = Scenario::load(&cli.scenario)
        .with_context(|| format!("failed to load {}", cli.scenario.display()))?;
    let frames = cli.frames.unwrap_or_else(|| scenario.frames());
    let frame_dt = cli
        .frame_ms
        .map(Duration::from_millis)
        .unwrap_or_else(|| scenario.frame_duration());

    let mut simulation = Simulation::new(&scenario, frame_dt)?;
    simulation.run(&scenario, frames);

    let report = Report::capture(simulation.world(), simulation.events(), simulation.frames());
    if cli.json {
        println!("{}", report.to_json().context("failed to encode report")?);
    } else {
        print!("{report}");
    }
    Ok(())
}

fn init_tracing(directive: Option<&str>) -> Result<()> {
    let filter = match directive {
        Some(directive) => EnvFilter::try_new(directive)
            .with_context(|| format!("invalid log filter `{directive}`"))?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}
