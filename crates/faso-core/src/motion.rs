//! Per-agent move selection and execution.
//!
//! Agents are processed in population order; each move reads the positions and
//! happiness already committed by earlier agents in the same iteration.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

use crate::SwarmError;
use crate::fitness::{FitnessStrategy, HappinessEvaluator, StrategyKind};
use crate::geometry::{Bounds, Position, ensure_finite, sample_range};
use crate::model::Agent;
use crate::spatial::SpatialQuery;

/// Move scale toward a happier neighbor never exceeds this share of the gap.
const TOWARD_DAMPING: f64 = 0.9;
/// Lower bound of the random scale applied to gradient and data-mean steps.
const MIN_STEP_SCALE: f64 = 0.1;

/// Outcome of one agent's turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveKind {
    /// Moved toward the happiest neighbor.
    Toward,
    /// Random move kept because happiness did not drop.
    RandomAccepted,
    /// Random move reverted.
    RandomRejected,
    /// Isolated landscape agent stepped down the gradient.
    Gradient,
    /// Isolated clustering agent stepped toward nearby data.
    DataMean,
    /// Explicit no-op (coincident agents or zero crowding-adjusted distance).
    Stay,
}

/// Chooses and applies one move per agent.
#[derive(Debug, Clone)]
pub struct MotionPlanner {
    random_move_factor: f64,
    step_size: f64,
    evaluator: HappinessEvaluator,
    bounds: Bounds,
}

impl MotionPlanner {
    #[must_use]
    pub fn new(
        random_move_factor: f64,
        step_size: f64,
        evaluator: HappinessEvaluator,
        bounds: Bounds,
    ) -> Self {
        Self {
            random_move_factor,
            step_size,
            evaluator,
            bounds,
        }
    }

    /// Decide and execute the move for `agents[idx]`.
    pub fn step<R: Rng + ?Sized>(
        &self,
        agents: &mut [Agent],
        idx: usize,
        strategy: &mut dyn FitnessStrategy,
        spatial: &SpatialQuery,
        rng: &mut R,
    ) -> Result<MoveKind, SwarmError> {
        let neighbors = spatial.neighbors(agents, idx, agents[idx].foraging_range);
        if !neighbors.is_empty() {
            let mut best = neighbors[0];
            for &candidate in &neighbors[1..] {
                if agents[candidate].happiness > agents[best].happiness {
                    best = candidate;
                }
            }
            if agents[best].happiness > agents[idx].happiness {
                return self.move_toward(agents, idx, best, strategy, spatial, rng);
            }
            return self.move_randomly(agents, idx, strategy, spatial, rng);
        }

        match strategy.kind() {
            StrategyKind::Landscape => self.descend_gradient(agents, idx, strategy, spatial, rng),
            StrategyKind::Density => self.approach_data(agents, idx, strategy, spatial, rng),
        }
    }

    /// Close part of the gap to `agents[target]`, stopping short of its crowding radius.
    pub fn move_toward<R: Rng + ?Sized>(
        &self,
        agents: &mut [Agent],
        idx: usize,
        target: usize,
        strategy: &mut dyn FitnessStrategy,
        spatial: &SpatialQuery,
        rng: &mut R,
    ) -> Result<MoveKind, SwarmError> {
        let agent = agents[idx];
        let other = agents[target];
        let distance = agent.position.distance(other.position);
        if distance == 0.0 {
            return Ok(MoveKind::Stay);
        }
        let adjusted = distance - (agent.crowding_range + other.crowding_range) * 0.5;
        if adjusted == 0.0 {
            return Ok(MoveKind::Stay);
        }

        let reach = sample_range(rng, 0.0, agent.foraging_range);
        let magnitude = reach.min(adjusted) * sample_range(rng, 0.0, TOWARD_DAMPING);
        let ux = (other.position.x - agent.position.x) / distance;
        let uy = (other.position.y - agent.position.y) / distance;
        let next = ensure_finite(
            agent.position.offset(ux * magnitude, uy * magnitude),
            "move_toward",
        )?;
        self.commit(agents, idx, next, strategy, spatial);
        Ok(MoveKind::Toward)
    }

    /// Random jump, kept only when happiness does not drop.
    pub fn move_randomly<R: Rng + ?Sized>(
        &self,
        agents: &mut [Agent],
        idx: usize,
        strategy: &mut dyn FitnessStrategy,
        spatial: &SpatialQuery,
        rng: &mut R,
    ) -> Result<MoveKind, SwarmError> {
        let before = agents[idx];
        let magnitude = sample_range(
            rng,
            0.0,
            before.foraging_range * self.random_move_factor + 1.0,
        );
        let angle = sample_range(rng, 0.0, TAU);
        let raw = before
            .position
            .offset(angle.cos() * magnitude, angle.sin() * magnitude);
        let next = self.bounds.clamp(ensure_finite(raw, "move_randomly")?);

        agents[idx].position = next;
        let (happiness, new_minimum) =
            self.evaluator.happiness_of(strategy, agents, idx, spatial);
        let accepted = happiness >= before.happiness;
        if accepted {
            agents[idx].happiness = happiness;
        } else {
            agents[idx].position = before.position;
            agents[idx].happiness = before.happiness;
        }
        if new_minimum {
            self.evaluator.evaluate_all(strategy, agents, spatial);
        }
        Ok(if accepted {
            MoveKind::RandomAccepted
        } else {
            MoveKind::RandomRejected
        })
    }

    /// Step an isolated agent down the landscape; a vanishing gradient falls back to a random move.
    pub fn descend_gradient<R: Rng + ?Sized>(
        &self,
        agents: &mut [Agent],
        idx: usize,
        strategy: &mut dyn FitnessStrategy,
        spatial: &SpatialQuery,
        rng: &mut R,
    ) -> Result<MoveKind, SwarmError> {
        let position = agents[idx].position;
        let Some((gx, gy)) = strategy.gradient(position) else {
            return self.move_randomly(agents, idx, strategy, spatial, rng);
        };
        let norm = gx.hypot(gy);
        if !(norm.is_finite() && norm > 0.0) {
            return self.move_randomly(agents, idx, strategy, spatial, rng);
        }
        let length = self.step_size * sample_range(rng, MIN_STEP_SCALE, 1.0);
        let next = ensure_finite(
            position.offset(-gx / norm * length, -gy / norm * length),
            "gradient_descent",
        )?;
        self.commit(agents, idx, next, strategy, spatial);
        Ok(MoveKind::Gradient)
    }

    /// Step an isolated agent toward the mean of the data it can see.
    pub fn approach_data<R: Rng + ?Sized>(
        &self,
        agents: &mut [Agent],
        idx: usize,
        strategy: &mut dyn FitnessStrategy,
        spatial: &SpatialQuery,
        rng: &mut R,
    ) -> Result<MoveKind, SwarmError> {
        let agent = agents[idx];
        let visible = spatial.data_within(agent.position, agent.foraging_range);
        if visible.is_empty() {
            return self.move_randomly(agents, idx, strategy, spatial, rng);
        }
        let count = visible.len() as f64;
        let (sum_x, sum_y) = visible.iter().fold((0.0, 0.0), |(sx, sy), point| {
            (sx + point.x - agent.position.x, sy + point.y - agent.position.y)
        });
        let scale = sample_range(rng, MIN_STEP_SCALE, 1.0);
        let next = ensure_finite(
            agent
                .position
                .offset(sum_x / count * scale, sum_y / count * scale),
            "approach_data",
        )?;
        self.commit(agents, idx, next, strategy, spatial);
        Ok(MoveKind::DataMean)
    }

    /// Clamp, store, and rescore. A new running minimum rescores the whole population.
    fn commit(
        &self,
        agents: &mut [Agent],
        idx: usize,
        next: Position,
        strategy: &mut dyn FitnessStrategy,
        spatial: &SpatialQuery,
    ) {
        agents[idx].position = self.bounds.clamp(next);
        let (happiness, new_minimum) =
            self.evaluator.happiness_of(strategy, agents, idx, spatial);
        agents[idx].happiness = happiness;
        if new_minimum {
            self.evaluator.evaluate_all(strategy, agents, spatial);
        }
    }
}
