//! Run parameters, fixed for the lifetime of a run.

use rand::{SeedableRng, rngs::SmallRng};
use serde::{Deserialize, Serialize};

use crate::SwarmError;
use crate::geometry::Bounds;
use crate::landscape::LandscapeFunction;

/// How many agents to create.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SwarmSize {
    /// Exactly this many agents.
    Fixed(usize),
    /// Dataset size × `swarm_size_factor` (or `default_swarm_size` without a dataset).
    #[default]
    Auto,
}

/// Fitness strategy selected at configuration time.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum StrategyConfig {
    /// Clustering: reward agents sitting over dense regions of the dataset.
    #[default]
    Density,
    /// Optimization: reward agents sitting low on a landscape.
    Landscape { function: LandscapeFunction },
}

impl StrategyConfig {
    #[must_use]
    pub const fn is_landscape(&self) -> bool {
        matches!(self, Self::Landscape { .. })
    }
}

/// Neighborhood index used for dataset queries.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DataIndexKind {
    LinearScan,
    /// Grid with cells as wide as the sensor range.
    #[default]
    UniformGrid,
}

/// Static configuration for a swarm run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SwarmConfig {
    /// Convergence passes per instance.
    pub iterations: u32,
    /// Independent restarts of the convergence phase.
    pub instances: u32,
    /// Population size selector.
    pub swarm_size: SwarmSize,
    /// Swarm size relative to the dataset size when `swarm_size` is `Auto`.
    pub swarm_size_factor: f64,
    /// Population used by `Auto` when there is no dataset to size against.
    pub default_swarm_size: usize,
    /// Fitness strategy.
    pub strategy: StrategyConfig,
    /// Search domain in landscape mode (clustering uses the dataset extrema).
    pub landscape_bounds: Bounds,
    /// Sensor range in landscape mode.
    pub landscape_sensor_range: f64,
    /// Minimum foraging range as a fraction of the sensor range where no data sets it.
    pub min_range_ratio: f64,
    /// Sensor range as a fraction of the average pairwise data distance.
    pub sensor_to_avg_dist_ratio: f64,
    /// Gradient step scale as a multiple of the sensor range.
    pub step_size_to_sensor_ratio: f64,
    /// Crowding range as a fraction of the foraging range.
    pub crowding_to_forage_ratio: f64,
    /// Weight of each crowding neighbor in the happiness penalty.
    pub crowding_aversion_factor: f64,
    /// Sensitivity of the foraging range to local density.
    pub beta: f64,
    /// Scales the random-move magnitude relative to the foraging range.
    pub random_move_factor: f64,
    /// Keeps the landscape objective finite at the running minimum.
    pub landscape_epsilon: f64,
    /// Sensor range used when the dataset has fewer than two distinct points.
    pub fallback_range: f64,
    /// Agents closer than this fraction of the sensor range merge into one cluster.
    pub consolidation_radius_ratio: f64,
    /// Emit a snapshot every N iterations; 0 disables periodic snapshots.
    pub snapshot_interval: u32,
    /// Pause between iterations for human-observable animation; 0 disables.
    pub iteration_delay_ms: u64,
    /// Optional RNG seed for reproducible runs.
    pub rng_seed: Option<u64>,
    /// Maximum number of iteration summaries retained in memory.
    pub history_capacity: usize,
    /// Index used for dataset neighborhood queries.
    pub data_index: DataIndexKind,
}

impl Default for SwarmConfig {
    fn default() -> Self {
        Self {
            iterations: 100,
            instances: 1,
            swarm_size: SwarmSize::Auto,
            swarm_size_factor: 0.5,
            default_swarm_size: 50,
            strategy: StrategyConfig::Density,
            landscape_bounds: Bounds::symmetric(5.0),
            landscape_sensor_range: 0.5,
            min_range_ratio: 0.2,
            sensor_to_avg_dist_ratio: 0.25,
            step_size_to_sensor_ratio: 2.0,
            crowding_to_forage_ratio: 0.2,
            crowding_aversion_factor: 1.0,
            beta: 1.0,
            random_move_factor: 1.0,
            landscape_epsilon: 1e-9,
            fallback_range: 1.0,
            consolidation_radius_ratio: 0.5,
            snapshot_interval: 1,
            iteration_delay_ms: 0,
            rng_seed: None,
            history_capacity: 1_024,
            data_index: DataIndexKind::UniformGrid,
        }
    }
}

impl SwarmConfig {
    /// Optimization-mode configuration over `function` with otherwise default knobs.
    #[must_use]
    pub fn landscape(function: LandscapeFunction) -> Self {
        Self {
            strategy: StrategyConfig::Landscape { function },
            ..Self::default()
        }
    }

    /// Validates every tunable, rejecting values that would break range invariants.
    pub fn validate(&self) -> Result<(), SwarmError> {
        if self.iterations == 0 {
            return Err(SwarmError::InvalidConfig("iterations must be non-zero"));
        }
        if self.instances == 0 {
            return Err(SwarmError::InvalidConfig("instances must be non-zero"));
        }
        if self.swarm_size == SwarmSize::Fixed(0) {
            return Err(SwarmError::EmptySwarm);
        }
        if !(self.swarm_size_factor.is_finite() && self.swarm_size_factor > 0.0) {
            return Err(SwarmError::InvalidConfig(
                "swarm_size_factor must be positive",
            ));
        }
        if self.default_swarm_size == 0 {
            return Err(SwarmError::InvalidConfig(
                "default_swarm_size must be non-zero",
            ));
        }
        if !self.landscape_bounds.is_valid() {
            return Err(SwarmError::InvalidConfig(
                "landscape_bounds must be finite with min <= max",
            ));
        }
        let positive = [
            self.landscape_sensor_range,
            self.sensor_to_avg_dist_ratio,
            self.step_size_to_sensor_ratio,
            self.landscape_epsilon,
            self.fallback_range,
            self.beta,
        ];
        if positive.iter().any(|v| !(v.is_finite() && *v > 0.0)) {
            return Err(SwarmError::InvalidConfig(
                "sensor, step, epsilon, fallback, and beta parameters must be positive",
            ));
        }
        let unit_interval = [self.min_range_ratio, self.crowding_to_forage_ratio];
        if unit_interval.iter().any(|v| !(0.0..=1.0).contains(v)) {
            return Err(SwarmError::InvalidConfig(
                "min_range_ratio and crowding_to_forage_ratio must lie in [0, 1]",
            ));
        }
        let non_negative = [
            self.crowding_aversion_factor,
            self.random_move_factor,
            self.consolidation_radius_ratio,
        ];
        if non_negative.iter().any(|v| !(v.is_finite() && *v >= 0.0)) {
            return Err(SwarmError::InvalidConfig(
                "crowding aversion, random move, and consolidation ratios must be non-negative",
            ));
        }
        if self.history_capacity == 0 {
            return Err(SwarmError::InvalidConfig(
                "history_capacity must be non-zero",
            ));
        }
        Ok(())
    }

    /// Number of agents for a dataset of `data_len` points.
    pub fn resolve_swarm_size(&self, data_len: usize) -> Result<usize, SwarmError> {
        let size = match self.swarm_size {
            SwarmSize::Fixed(n) => n,
            SwarmSize::Auto if data_len == 0 => self.default_swarm_size,
            SwarmSize::Auto => (data_len as f64 * self.swarm_size_factor) as usize,
        };
        if size == 0 {
            return Err(SwarmError::EmptySwarm);
        }
        Ok(size)
    }

    /// Returns the configured RNG, seeding from entropy if no seed is set.
    pub(crate) fn seeded_rng(&self) -> SmallRng {
        match self.rng_seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => {
                let seed: u64 = rand::random();
                SmallRng::seed_from_u64(seed)
            }
        }
    }
}
