use env_logger::Builder;
use log::{LevelFilter, error, info};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

mod common;
mod simulation;

use common::config::{ConfigLoadError, RunConfig};
use common::topology::TopologyRegistry;
use simulation::stats::{append_summary_line, write_report};
use simulation::{Network, SimulationError};

const DEFAULT_CONFIG_PATH: &str = "scenarios/default.toml";

/// Load the configuration, run the scenario and write its results.
fn run(config_path: &Path) -> anyhow::Result<()> {
    let config = RunConfig::load(config_path)?;

    let topologies = TopologyRegistry::with_presets();
    let mut network = Network::build(&config, &topologies)?;
    let summary = network.run()?;

    for station in &summary.stations {
        info!(
            "Station {}: {} sent, {} received, delivery ratio {:.4}",
            station.station_id, station.sent, station.received, station.ratio
        );
    }
    info!(
        "Delivery ratio {:.4} (raw {:.4}, station average {:.4}), {} lost and {} collided receptions",
        summary.overall_ratio, summary.raw_ratio, summary.average_station_ratio, summary.lost_receptions, summary.collided_receptions
    );

    let results_path = append_summary_line(&config.results_dir, &summary)?;
    info!("Appended summary to {}", results_path.display());

    if let Some(report_path) = &config.report_path {
        write_report(report_path, &network.report(summary))?;
        info!("Wrote run report to {}", report_path.display());
    }

    Ok(())
}

fn exit_code(err: &anyhow::Error) -> u8 {
    if let Some(e) = err.downcast_ref::<SimulationError>() {
        e.exit_code()
    } else if let Some(e) = err.downcast_ref::<ConfigLoadError>() {
        e.exit_code()
    } else {
        1
    }
}

/// Debug for this crate, info for everything else.
fn logger_builder() -> Builder {
    let mut builder = Builder::new();
    builder
        .filter_level(LevelFilter::Info)
        .filter(Some("lora_interference_simulator"), LevelFilter::Debug);
    builder
}

fn main() -> ExitCode {
    // Logging setup, RUST_LOG overrides the defaults
    logger_builder().parse_default_env().init();

    let config_path = std::env::args().nth(1).map(PathBuf::from).unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
    info!("Starting up with configuration {}", config_path.display());

    match run(&config_path) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::from(exit_code(&e))
        }
    }
}
