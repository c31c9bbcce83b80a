//! Per-iteration adaptation of foraging and crowding radii.

use tracing::warn;

use crate::config::SwarmConfig;
use crate::fitness::FitnessStrategy;
use crate::model::{Agent, Dataset};
use crate::spatial::SpatialQuery;

/// Domain-derived radii, computed once per run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DomainScale {
    /// Upper bound of the foraging range.
    pub sensor_range: f64,
    /// Lower bound of the foraging range.
    pub min_range: f64,
    /// Scale of an isolated agent's gradient step.
    pub step_size: f64,
}

impl DomainScale {
    /// Derive radii from the configuration and, in clustering mode, the dataset geometry.
    #[must_use]
    pub fn derive(config: &SwarmConfig, data: &Dataset) -> Self {
        let (sensor_range, min_range) = if config.strategy.is_landscape() {
            let sensor = config.landscape_sensor_range;
            (sensor, sensor * config.min_range_ratio)
        } else {
            match data.pairwise_stats() {
                Some(stats) if stats.average > 0.0 => {
                    let sensor = stats.average * config.sensor_to_avg_dist_ratio;
                    (sensor, stats.min_nonzero.min(sensor))
                }
                _ => {
                    warn!(
                        points = data.len(),
                        fallback = config.fallback_range,
                        "dataset has fewer than two distinct points; using fallback range"
                    );
                    let sensor = config.fallback_range;
                    (sensor, sensor * config.min_range_ratio)
                }
            }
        };
        Self {
            sensor_range,
            min_range,
            step_size: sensor_range * config.step_size_to_sensor_ratio,
        }
    }
}

/// Shrinks the foraging range where the neighborhood is rich and widens it where sparse.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangeAdapter {
    sensor_range: f64,
    min_range: f64,
    beta: f64,
    crowding_ratio: f64,
}

impl RangeAdapter {
    #[must_use]
    pub fn new(scale: &DomainScale, beta: f64, crowding_ratio: f64) -> Self {
        Self {
            sensor_range: scale.sensor_range,
            min_range: scale.min_range,
            beta,
            crowding_ratio,
        }
    }

    /// `min + (sensor − min) / (1 + β·density)`, kept inside `[min, sensor]`.
    #[must_use]
    pub fn candidate(&self, density: f64) -> f64 {
        let span = self.sensor_range - self.min_range;
        let raw = self.min_range + span / (1.0 + self.beta * density.max(0.0));
        if raw.is_nan() {
            return self.min_range;
        }
        raw.clamp(self.min_range, self.sensor_range)
    }

    /// Blend the candidate 50/50 with the current range and derive the crowding range.
    pub fn adapt(&self, agent: &mut Agent, density: f64) {
        let candidate = self.candidate(density);
        agent.foraging_range = ((candidate + agent.foraging_range) * 0.5)
            .clamp(self.min_range, self.sensor_range);
        agent.crowding_range = agent.foraging_range * self.crowding_ratio;
    }

    /// Adapt every agent. Densities are read against the ranges at the start of the pass.
    pub fn adapt_all(
        &self,
        strategy: &dyn FitnessStrategy,
        agents: &mut [Agent],
        spatial: &SpatialQuery,
    ) {
        let densities: Vec<f64> = (0..agents.len())
            .map(|idx| strategy.range_density(agents, idx, spatial))
            .collect();
        for (agent, density) in agents.iter_mut().zip(densities) {
            self.adapt(agent, density);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DataIndexKind, StrategyConfig};
    use crate::fitness::DensityStrategy;
    use crate::geometry::Position;
    use crate::landscape::LandscapeFunction;

    fn adapter() -> RangeAdapter {
        let scale = DomainScale {
            sensor_range: 2.0,
            min_range: 0.4,
            step_size: 1.0,
        };
        RangeAdapter::new(&scale, 1.0, 0.2)
    }

    #[test]
    fn candidate_shrinks_with_density() {
        let adapter = adapter();
        assert_eq!(adapter.candidate(0.0), 2.0);
        assert!((adapter.candidate(1.0) - 1.2).abs() < 1e-12);
        assert!(adapter.candidate(1e12) >= 0.4);
        assert_eq!(adapter.candidate(f64::INFINITY), 0.4);
        assert_eq!(adapter.candidate(-3.0), 2.0);
    }

    #[test]
    fn adapt_smooths_and_keeps_invariants() {
        let adapter = adapter();
        let mut agent = Agent::spawn(Position::new(0.0, 0.0), 2.0, 0.2);
        adapter.adapt(&mut agent, 1.0);
        assert!((agent.foraging_range - 1.6).abs() < 1e-12);
        assert!((agent.crowding_range - 0.32).abs() < 1e-12);
        for density in [0.0, 5.0, 1e9, f64::INFINITY, 3.0] {
            adapter.adapt(&mut agent, density);
            assert!(agent.foraging_range >= 0.4 && agent.foraging_range <= 2.0);
            assert!(agent.crowding_range >= 0.0);
            assert!(agent.crowding_range <= agent.foraging_range);
        }
    }

    #[test]
    fn clustering_scale_uses_pairwise_distances() {
        let config = SwarmConfig {
            sensor_to_avg_dist_ratio: 0.5,
            ..SwarmConfig::default()
        };
        let data = Dataset::from_pairs(&[(0.0, 0.0), (4.0, 0.0)]);
        let scale = DomainScale::derive(&config, &data);
        assert_eq!(scale.sensor_range, 2.0);
        assert_eq!(scale.min_range, 2.0);
        assert_eq!(scale.step_size, 4.0);
    }

    #[test]
    fn degenerate_dataset_falls_back() {
        let config = SwarmConfig {
            fallback_range: 3.0,
            ..SwarmConfig::default()
        };
        let scale = DomainScale::derive(&config, &Dataset::from_pairs(&[(1.0, 1.0), (1.0, 1.0)]));
        assert_eq!(scale.sensor_range, 3.0);
        assert!((scale.min_range - 0.6).abs() < 1e-12);
        let single = DomainScale::derive(&config, &Dataset::from_pairs(&[(1.0, 1.0)]));
        assert_eq!(single.sensor_range, 3.0);
    }

    #[test]
    fn landscape_scale_is_fixed() {
        let config = SwarmConfig {
            strategy: StrategyConfig::Landscape {
                function: LandscapeFunction::Ackley,
            },
            ..SwarmConfig::default()
        };
        let scale = DomainScale::derive(&config, &Dataset::empty());
        assert_eq!(scale.sensor_range, 0.5);
        assert!((scale.min_range - 0.1).abs() < 1e-12);
        assert_eq!(scale.step_size, 1.0);
    }

    #[test]
    fn adapt_all_narrows_crowded_agents() {
        let spatial =
            SpatialQuery::new(Dataset::empty(), DataIndexKind::LinearScan, 1.0).expect("query");
        let adapter = adapter();
        let mut agents = vec![
            Agent::spawn(Position::new(0.0, 0.0), 2.0, 0.2),
            Agent::spawn(Position::new(0.5, 0.0), 2.0, 0.2),
            Agent::spawn(Position::new(50.0, 0.0), 2.0, 0.2),
        ];
        adapter.adapt_all(&DensityStrategy::new(), &mut agents, &spatial);
        assert!(agents[0].foraging_range < 2.0);
        assert!(agents[1].foraging_range < 2.0);
        assert_eq!(agents[2].foraging_range, 2.0);
    }
}
