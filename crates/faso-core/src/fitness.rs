//! Fitness strategies and the happiness score built on top of them.
//!
//! `happiness = objective / (1 + crowding_aversion × crowding_neighbors)`

use std::fmt;
use tracing::debug;

use crate::geometry::Position;
use crate::landscape::LandscapeFunction;
use crate::model::Agent;
use crate::spatial::SpatialQuery;

/// Which family a strategy belongs to; drives the isolated-agent branch of motion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrategyKind {
    Density,
    Landscape,
}

/// Raw objective value for one agent position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObjectiveSample {
    pub value: f64,
    /// True when sampling this position lowered the shared running minimum.
    pub new_minimum: bool,
}

/// Pluggable scoring capability for the swarm.
pub trait FitnessStrategy: Send + fmt::Debug {
    /// Strategy family.
    fn kind(&self) -> StrategyKind;

    /// Objective at the agent's current position, before the crowding penalty.
    fn objective(&mut self, agent: &Agent, spatial: &SpatialQuery) -> ObjectiveSample;

    /// Local density term consumed by the range adapter.
    fn range_density(&self, agents: &[Agent], idx: usize, spatial: &SpatialQuery) -> f64;

    /// Record every position before a full evaluation pass. Returns true if the
    /// running minimum moved.
    fn prime(&mut self, _agents: &[Agent]) -> bool {
        false
    }

    /// Landscape height, when the strategy has one.
    fn landscape(&self, _position: Position) -> Option<f64> {
        None
    }

    /// Landscape gradient, when the strategy has one.
    fn gradient(&self, _position: Position) -> Option<(f64, f64)> {
        None
    }

    /// Lowest landscape value observed so far and where it was seen.
    fn running_minimum(&self) -> Option<(Position, f64)> {
        None
    }
}

/// Clustering objective: share of the dataset inside the agent's foraging range.
#[derive(Debug, Clone, Default)]
pub struct DensityStrategy;

impl DensityStrategy {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl FitnessStrategy for DensityStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Density
    }

    fn objective(&mut self, agent: &Agent, spatial: &SpatialQuery) -> ObjectiveSample {
        let total = spatial.data_len();
        let value = if total == 0 {
            0.0
        } else {
            spatial.count_data_within(agent.position, agent.foraging_range) as f64 / total as f64
        };
        ObjectiveSample {
            value,
            new_minimum: false,
        }
    }

    /// Number of other agents inside the foraging range.
    fn range_density(&self, agents: &[Agent], idx: usize, spatial: &SpatialQuery) -> f64 {
        spatial.count_neighbors(agents, idx, agents[idx].foraging_range) as f64
    }
}

/// Optimization objective: closeness to the lowest landscape value seen by any agent.
#[derive(Debug, Clone)]
pub struct LandscapeStrategy {
    function: LandscapeFunction,
    epsilon: f64,
    minimum: f64,
    argmin: Position,
}

impl LandscapeStrategy {
    #[must_use]
    pub fn new(function: LandscapeFunction, epsilon: f64) -> Self {
        Self {
            function,
            epsilon,
            minimum: f64::INFINITY,
            argmin: Position::default(),
        }
    }

    fn observe(&mut self, position: Position) -> (f64, bool) {
        let height = self.function.value(position);
        if height < self.minimum {
            self.minimum = height;
            self.argmin = position;
            debug!(
                running_minimum = height,
                x = position.x,
                y = position.y,
                "new lowest landscape value"
            );
            return (height, true);
        }
        (height, false)
    }

    fn goodness(&self, height: f64) -> f64 {
        1.0 / (height - self.minimum + self.epsilon)
    }
}

impl FitnessStrategy for LandscapeStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Landscape
    }

    fn objective(&mut self, agent: &Agent, _spatial: &SpatialQuery) -> ObjectiveSample {
        let (height, new_minimum) = self.observe(agent.position);
        ObjectiveSample {
            value: self.goodness(height),
            new_minimum,
        }
    }

    /// Position goodness, measured against the running minimum.
    fn range_density(&self, agents: &[Agent], idx: usize, _spatial: &SpatialQuery) -> f64 {
        self.goodness(self.function.value(agents[idx].position))
    }

    fn prime(&mut self, agents: &[Agent]) -> bool {
        let mut moved = false;
        for agent in agents {
            moved |= self.observe(agent.position).1;
        }
        moved
    }

    fn landscape(&self, position: Position) -> Option<f64> {
        Some(self.function.value(position))
    }

    fn gradient(&self, position: Position) -> Option<(f64, f64)> {
        Some(self.function.gradient(position))
    }

    fn running_minimum(&self) -> Option<(Position, f64)> {
        self.minimum.is_finite().then_some((self.argmin, self.minimum))
    }
}

/// Combines a strategy objective with the crowding penalty.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HappinessEvaluator {
    crowding_aversion: f64,
}

impl HappinessEvaluator {
    #[must_use]
    pub const fn new(crowding_aversion: f64) -> Self {
        Self { crowding_aversion }
    }

    /// Apply the crowding penalty for `crowded` neighbors.
    #[must_use]
    pub fn combine(&self, objective: f64, crowded: usize) -> f64 {
        objective / (1.0 + self.crowding_aversion * crowded as f64)
    }

    /// Happiness of `agents[idx]` at its current position.
    pub fn happiness_of(
        &self,
        strategy: &mut dyn FitnessStrategy,
        agents: &[Agent],
        idx: usize,
        spatial: &SpatialQuery,
    ) -> (f64, bool) {
        let agent = &agents[idx];
        let sample = strategy.objective(agent, spatial);
        let crowded = spatial.count_neighbors(agents, idx, agent.crowding_range);
        (self.combine(sample.value, crowded), sample.new_minimum)
    }

    /// Rescore every agent. Every position is observed first so all scores share
    /// one running minimum.
    pub fn evaluate_all(
        &self,
        strategy: &mut dyn FitnessStrategy,
        agents: &mut [Agent],
        spatial: &SpatialQuery,
    ) {
        strategy.prime(agents);
        let scores: Vec<f64> = (0..agents.len())
            .map(|idx| self.happiness_of(strategy, agents, idx, spatial).0)
            .collect();
        for (agent, score) in agents.iter_mut().zip(scores) {
            agent.happiness = score;
        }
    }
}
