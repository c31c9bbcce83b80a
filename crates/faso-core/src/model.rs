//! Agents, data points, and the containers that own them.

use rand::Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::geometry::{Bounds, Position};

/// Immutable input datum.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct DataPoint {
    pub x: f64,
    pub y: f64,
    /// Optional label carried through from the input; the engine never reads it.
    pub group: i32,
}

impl DataPoint {
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y, group: 0 }
    }

    #[must_use]
    pub const fn position(&self) -> Position {
        Position::new(self.x, self.y)
    }
}

/// Distance statistics over every unordered pair of data points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairwiseStats {
    /// Mean distance over all pairs (coincident pairs included).
    pub average: f64,
    /// Smallest strictly positive pairwise distance.
    pub min_nonzero: f64,
}

/// Ordered, shared, read-only dataset.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    points: Arc<[DataPoint]>,
}

impl Dataset {
    #[must_use]
    pub fn new(points: Vec<DataPoint>) -> Self {
        Self {
            points: points.into(),
        }
    }

    /// Dataset with no points (landscape mode does not need one).
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build from raw `(x, y)` pairs.
    #[must_use]
    pub fn from_pairs(pairs: &[(f64, f64)]) -> Self {
        Self::new(pairs.iter().map(|&(x, y)| DataPoint::new(x, y)).collect())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    #[must_use]
    pub fn points(&self) -> &[DataPoint] {
        &self.points
    }

    /// Cheap shared handle used by snapshots.
    #[must_use]
    pub fn shared(&self) -> Arc<[DataPoint]> {
        Arc::clone(&self.points)
    }

    /// Extrema of the dataset, or `None` when empty.
    #[must_use]
    pub fn bounds(&self) -> Option<Bounds> {
        Bounds::enclosing(self.points.iter().map(DataPoint::position))
    }

    /// Pairwise distance statistics, or `None` when fewer than two distinct points exist.
    ///
    /// Rows are computed in parallel and reduced sequentially so the result is
    /// identical from run to run.
    #[must_use]
    pub fn pairwise_stats(&self) -> Option<PairwiseStats> {
        let n = self.points.len();
        if n < 2 {
            return None;
        }
        let points = &self.points;
        let rows: Vec<(f64, f64)> = (0..n)
            .into_par_iter()
            .map(|i| {
                let origin = points[i].position();
                let mut sum = 0.0;
                let mut min = f64::INFINITY;
                for other in &points[i + 1..] {
                    let d = origin.distance(other.position());
                    sum += d;
                    if d > 0.0 && d < min {
                        min = d;
                    }
                }
                (sum, min)
            })
            .collect();

        let mut total = 0.0;
        let mut min_nonzero = f64::INFINITY;
        for (sum, min) in rows {
            total += sum;
            min_nonzero = min_nonzero.min(min);
        }
        if !min_nonzero.is_finite() {
            return None;
        }
        let pairs = (n * (n - 1) / 2) as f64;
        Some(PairwiseStats {
            average: total / pairs,
            min_nonzero,
        })
    }
}

impl From<Vec<DataPoint>> for Dataset {
    fn from(points: Vec<DataPoint>) -> Self {
        Self::new(points)
    }
}

/// Mutable simulation entity.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Agent {
    pub position: Position,
    /// Last computed fitness; stale until the next evaluation pass.
    pub happiness: f64,
    pub foraging_range: f64,
    pub crowding_range: f64,
}

impl Agent {
    /// Fresh agent at `position` with the widest foraging range.
    #[must_use]
    pub fn spawn(position: Position, sensor_range: f64, crowding_ratio: f64) -> Self {
        Self {
            position,
            happiness: 0.0,
            foraging_range: sensor_range,
            crowding_range: sensor_range * crowding_ratio,
        }
    }
}

/// Fixed-size arena of agents addressed by index in population order.
#[derive(Debug, Clone, Default)]
pub struct Population {
    agents: Vec<Agent>,
}

impl Population {
    /// Scatter `count` agents uniformly inside `bounds`.
    pub fn scatter<R: Rng + ?Sized>(
        count: usize,
        bounds: &Bounds,
        sensor_range: f64,
        crowding_ratio: f64,
        rng: &mut R,
    ) -> Self {
        let agents = (0..count)
            .map(|_| Agent::spawn(bounds.sample(rng), sensor_range, crowding_ratio))
            .collect();
        Self { agents }
    }

    /// Reset every agent in place to a fresh random position, keeping the count.
    pub fn rescatter<R: Rng + ?Sized>(
        &mut self,
        bounds: &Bounds,
        sensor_range: f64,
        crowding_ratio: f64,
        rng: &mut R,
    ) {
        for agent in &mut self.agents {
            *agent = Agent::spawn(bounds.sample(rng), sensor_range, crowding_ratio);
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.agents.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Agent] {
        &self.agents
    }

    #[must_use]
    pub fn as_mut_slice(&mut self) -> &mut [Agent] {
        &mut self.agents
    }

    #[must_use]
    pub fn get(&self, idx: usize) -> Option<&Agent> {
        self.agents.get(idx)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Agent> + '_ {
        self.agents.iter()
    }

    /// Deep copy used for snapshots.
    #[must_use]
    pub fn to_vec(&self) -> Vec<Agent> {
        self.agents.clone()
    }

    #[must_use]
    pub fn positions(&self) -> Vec<Position> {
        self.agents.iter().map(|a| a.position).collect()
    }
}
