//! Command-line surface and its translation into a [`SwarmConfig`].

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use faso_core::{LandscapeFunction, StrategyConfig, SwarmConfig, SwarmSize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(
    name = "faso",
    version,
    about = "Foraging agent swarm optimization: cluster 2D data or minimize a landscape"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Concentrate agents over dense regions of a two-column CSV dataset.
    Cluster {
        /// Dataset file with one `x,y` pair per line.
        data: PathBuf,
        #[command(flatten)]
        run: RunArgs,
    },
    /// Search a landscape for minima with independent restarts.
    Optimize {
        /// Landscape to minimize (styblinski, ackley, sphere).
        #[arg(long, short = 'f', default_value = "styblinski")]
        function: LandscapeFunction,
        /// Independent restarts of the convergence loop.
        #[arg(long)]
        instances: Option<u32>,
        /// Results file; stdout is used when it cannot be opened.
        #[arg(long, short = 'o', default_value = "results.csv")]
        output: PathBuf,
        #[command(flatten)]
        run: RunArgs,
    },
}

/// Options shared by every subcommand. Each one overrides the config file.
#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Convergence passes per instance.
    #[arg(long, short = 'n')]
    pub iterations: Option<u32>,
    /// Number of agents (defaults to half the dataset, or 50 when optimizing).
    #[arg(long)]
    pub swarm_size: Option<usize>,
    /// RNG seed for reproducible runs.
    #[arg(long, env = "FASO_SEED")]
    pub seed: Option<u64>,
    /// Emit a snapshot every N iterations (0 disables).
    #[arg(long)]
    pub snapshot_interval: Option<u32>,
    /// Pause between iterations, in milliseconds.
    #[arg(long)]
    pub delay_ms: Option<u64>,
    /// JSON file with a full or partial swarm configuration.
    #[arg(long, env = "FASO_CONFIG")]
    pub config: Option<PathBuf>,
    /// Snapshots buffered between the engine and the reporter.
    #[arg(long, default_value_t = 64)]
    pub snapshot_capacity: usize,
}

impl RunArgs {
    /// Config file (or defaults) with command-line overrides applied.
    pub fn resolve(&self) -> Result<SwarmConfig> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => SwarmConfig::default(),
        };
        if let Some(iterations) = self.iterations {
            config.iterations = iterations;
        }
        if let Some(size) = self.swarm_size {
            config.swarm_size = SwarmSize::Fixed(size);
        }
        if let Some(seed) = self.seed {
            config.rng_seed = Some(seed);
        }
        if let Some(interval) = self.snapshot_interval {
            config.snapshot_interval = interval;
        }
        if let Some(delay) = self.delay_ms {
            config.iteration_delay_ms = delay;
        }
        Ok(config)
    }
}

impl Command {
    #[must_use]
    pub fn run_args(&self) -> &RunArgs {
        match self {
            Self::Cluster { run, .. } | Self::Optimize { run, .. } => run,
        }
    }

    /// Final swarm configuration for this subcommand.
    pub fn swarm_config(&self) -> Result<SwarmConfig> {
        let mut config = self.run_args().resolve()?;
        match self {
            Self::Cluster { .. } => config.strategy = StrategyConfig::Density,
            Self::Optimize {
                function,
                instances,
                ..
            } => {
                config.strategy = StrategyConfig::Landscape {
                    function: *function,
                };
                if let Some(instances) = instances {
                    config.instances = *instances;
                }
            }
        }
        Ok(config)
    }
}

fn load_config(path: &Path) -> Result<SwarmConfig> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("failed to parse config {}", path.display()))
}
