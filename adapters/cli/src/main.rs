#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Headless driver that runs a synthetic population through the constellation engine.

mod ascii;
mod logging;
mod simulation;

use std::{fs, path::PathBuf, time::Duration};

use anyhow::{ensure, Context, Result};
use clap::Parser;
use constellation_engine::{Engine, EngineConfig};
use constellation_rendering::render_overlay;
use log::LevelFilter;

use crate::{
    ascii::AsciiSurface,
    simulation::{PopulationConfig, Simulation},
};

#[derive(Debug, Parser)]
#[command(name = "constellation")]
#[command(about = "Runs a headless population through the constellation engine")]
struct Cli {
    /// Number of agents to spawn
    #[arg(short, long, default_value_t = 120)]
    agents: usize,

    /// Number of simulation ticks to run
    #[arg(short, long, default_value_t = 1800)]
    ticks: u64,

    /// Simulated frames per second
    #[arg(long, default_value_t = 60.0)]
    fps: f32,

    /// Seed for both the population and the pattern selector
    #[arg(short, long, default_value_t = 42)]
    seed: u64,

    /// Side length of the square arena
    #[arg(long, default_value_t = 1600.0)]
    arena: f32,

    /// Optional TOML file overriding the engine tuning
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Ticks between reports; 0 prints only the final report
    #[arg(long, default_value_t = 300)]
    report_every: u64,

    /// Print reports as JSON lines instead of log records
    #[arg(long)]
    json: bool,

    /// Print a character overlay of the final frame, this many columns wide
    #[arg(long)]
    ascii: Option<usize>,

    /// Log verbosity
    #[arg(long, default_value = "info")]
    log_level: LevelFilter,
}

/// Entry point for the constellation command-line interface.
fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::setup_logging(cli.log_level)?;
    ensure!(
        cli.fps.is_finite() && cli.fps > 0.0,
        "fps must be positive (received {})",
        cli.fps
    );
    ensure!(
        cli.arena.is_finite() && cli.arena > 0.0,
        "arena must be positive (received {})",
        cli.arena
    );

    let config = load_config(cli.config.as_ref())?;
    let engine = Engine::new(config, cli.seed).context("engine configuration rejected")?;
    let population = PopulationConfig {
        agents: cli.agents,
        arena: cli.arena,
        ..PopulationConfig::default()
    };
    let mut simulation = Simulation::new(engine, population, cli.seed);
    log::info!(
        "simulating {} agents for {} ticks at {} fps (seed {})",
        cli.agents,
        cli.ticks,
        cli.fps,
        cli.seed
    );

    let dt = 1.0 / cli.fps;
    for tick in 1..=cli.ticks {
        simulation.step(dt);
        if cli.report_every > 0 && tick % cli.report_every == 0 && tick != cli.ticks {
            emit(&simulation, cli.json)?;
        }
    }
    emit(&simulation, cli.json)?;

    if let Some(columns) = cli.ascii {
        let mut surface = AsciiSurface::new(columns, simulation.arena());
        surface.plot_free_agents(simulation.agents());
        let time = Duration::from_secs_f32(cli.ticks as f32 * dt);
        render_overlay(simulation.engine(), &mut surface, time);
        println!("{}", surface.into_string());
    }
    Ok(())
}

fn load_config(path: Option<&PathBuf>) -> Result<EngineConfig> {
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    EngineConfig::from_toml_str(&text)
        .with_context(|| format!("invalid config {}", path.display()))
}

fn emit(simulation: &Simulation, json: bool) -> Result<()> {
    let report = simulation.report();
    if json {
        let line = serde_json::to_string(&report).context("failed to encode report")?;
        println!("{line}");
    } else {
        let stats = &report.stats;
        log::info!(
            "tick {}: {} alive, {} formations holding {} agents, variety {:.2}, created {} merged {} broken {}",
            report.tick,
            report.alive,
            stats.active_constellations,
            stats.members_in_formation,
            stats.variety_score,
            stats.counters.created,
            stats.counters.merged,
            stats.counters.broken_integrity
                + stats.counters.broken_undermanned
                + stats.counters.broken_expired
                + stats.counters.broken_requested
        );
    }
    Ok(())
}
