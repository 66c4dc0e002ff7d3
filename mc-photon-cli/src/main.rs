use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mc_photon_core::config::ScenarioConfig;
use mc_photon_core::driver::Driver;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mc-photon", about = "Monte Carlo photon transport simulator")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a scenario to completion.
    Run {
        #[arg(long)]
        scenario: PathBuf,
        #[arg(long)]
        from: Option<usize>,
        #[arg(long)]
        to: Option<usize>,
    },
    /// Load and validate a scenario without running any photons.
    Validate {
        #[arg(long)]
        scenario: PathBuf,
    },
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::Run { scenario, from, to } => run(scenario, from, to),
        Command::Validate { scenario } => validate(scenario),
    }
}

fn run(scenario: PathBuf, from: Option<usize>, to: Option<usize>) -> Result<()> {
    let mut config = ScenarioConfig::load(&scenario)
        .with_context(|| format!("failed to load scenario {}", scenario.display()))?;
    if let Some(from) = from {
        config.driver.time_start = from;
    }
    if let Some(to) = to {
        config.driver.time_end = to;
    }

    let driver = Driver::new(config).context("failed to build medium from scenario")?;
    driver.run().context("simulation run failed")?;
    Ok(())
}

fn validate(scenario: PathBuf) -> Result<()> {
    let config = ScenarioConfig::load(&scenario)
        .with_context(|| format!("failed to load scenario {}", scenario.display()))?;
    let medium = config
        .build_medium()
        .context("scenario loaded but medium construction failed")?;

    println!("scenario valid: {} layer(s)", medium.layer_count());
    for (i, layer) in medium.layers().iter().enumerate() {
        println!(
            "  layer {i}: [{:.3}, {:.3}) mu_a={:.3} mu_s={:.3} g={:.3} n={:.3} ({} absorber(s))",
            layer.depth_start,
            layer.depth_end,
            layer.mu_a,
            layer.mu_s,
            layer.g,
            layer.n,
            layer.absorbers.len(),
        );
    }
    println!("  detectors: {}", medium.detectors().len());
    Ok(())
}
