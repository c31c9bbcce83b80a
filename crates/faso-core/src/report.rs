//! Run outputs: per-iteration summaries, result rows, and cluster finishers.

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::engine::EnginePhase;
use crate::geometry::Position;
use crate::model::{Agent, DataPoint};
use crate::motion::MoveKind;

/// Count of each move kind taken during one iteration.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MoveTally {
    pub toward: usize,
    pub random_accepted: usize,
    pub random_rejected: usize,
    pub gradient: usize,
    pub data_mean: usize,
    pub stay: usize,
}

impl MoveTally {
    pub fn record(&mut self, kind: MoveKind) {
        match kind {
            MoveKind::Toward => self.toward += 1,
            MoveKind::RandomAccepted => self.random_accepted += 1,
            MoveKind::RandomRejected => self.random_rejected += 1,
            MoveKind::Gradient => self.gradient += 1,
            MoveKind::DataMean => self.data_mean += 1,
            MoveKind::Stay => self.stay += 1,
        }
    }

    #[must_use]
    pub const fn total(&self) -> usize {
        self.toward
            + self.random_accepted
            + self.random_rejected
            + self.gradient
            + self.data_mean
            + self.stay
    }
}

/// Aggregate statistics captured after each iteration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IterationSummary {
    pub instance: u32,
    pub iteration: u32,
    pub mean_happiness: f64,
    pub best_happiness: f64,
    pub mean_foraging_range: f64,
    /// Lowest landscape value seen so far; `None` in clustering mode.
    pub running_minimum: Option<f64>,
    pub moves: MoveTally,
}

impl IterationSummary {
    /// Summarize the population after an iteration.
    #[must_use]
    pub fn capture(
        instance: u32,
        iteration: u32,
        agents: &[Agent],
        running_minimum: Option<f64>,
        moves: MoveTally,
    ) -> Self {
        let count = agents.len().max(1) as f64;
        let mut happiness = 0.0;
        let mut range = 0.0;
        let mut best = f64::NEG_INFINITY;
        for agent in agents {
            happiness += agent.happiness;
            range += agent.foraging_range;
            best = best.max(agent.happiness);
        }
        Self {
            instance,
            iteration,
            mean_happiness: happiness / count,
            best_happiness: best,
            mean_foraging_range: range / count,
            running_minimum,
            moves,
        }
    }
}

/// Final agent positions of one instance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InstanceResult {
    pub instance: u32,
    pub positions: Vec<Position>,
}

impl InstanceResult {
    /// One row per agent in population order.
    pub fn rows(&self) -> impl Iterator<Item = ResultRow> + '_ {
        self.positions
            .iter()
            .enumerate()
            .map(|(agent, p)| ResultRow {
                instance: self.instance,
                agent,
                x: p.x,
                y: p.y,
            })
    }
}

/// One `(x, y)` record per agent per instance.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ResultRow {
    pub instance: u32,
    pub agent: usize,
    pub x: f64,
    pub y: f64,
}

/// Every result row of a run, instance-major.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ResultSet {
    rows: Vec<ResultRow>,
}

impl ResultSet {
    pub fn extend_from(&mut self, result: &InstanceResult) {
        self.rows.extend(result.rows());
    }

    #[must_use]
    pub fn rows(&self) -> &[ResultRow] {
        &self.rows
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows belonging to `instance`.
    pub fn instance(&self, instance: u32) -> impl Iterator<Item = &ResultRow> + '_ {
        self.rows.iter().filter(move |row| row.instance == instance)
    }
}

/// Agents merged into one cluster.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Cluster {
    pub id: usize,
    pub center: Position,
    /// Agent indices in population order; the first is the seed.
    pub members: Vec<usize>,
}

impl Cluster {
    /// Greedy merge in population order: each agent joins the first cluster whose
    /// seed lies within `radius`, otherwise it seeds a new one.
    #[must_use]
    pub fn consolidate(agents: &[Agent], radius: f64) -> Vec<Self> {
        let radius_sq = radius * radius;
        let mut clusters: Vec<Self> = Vec::new();
        for (idx, agent) in agents.iter().enumerate() {
            let home = clusters.iter_mut().find(|cluster| {
                agents[cluster.members[0]]
                    .position
                    .distance_sq(agent.position)
                    <= radius_sq
            });
            match home {
                Some(cluster) => cluster.members.push(idx),
                None => clusters.push(Self {
                    id: clusters.len(),
                    center: agent.position,
                    members: vec![idx],
                }),
            }
        }
        for cluster in &mut clusters {
            let n = cluster.members.len() as f64;
            let (sx, sy) = cluster.members.iter().fold((0.0, 0.0), |(sx, sy), &m| {
                (sx + agents[m].position.x, sy + agents[m].position.y)
            });
            cluster.center = Position::new(sx / n, sy / n);
        }
        clusters
    }
}

/// Nearest-cluster label for every data point, in dataset order.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClusterAssignment {
    pub labels: Vec<Option<usize>>,
}

impl ClusterAssignment {
    /// Label each point with the id of the closest cluster center; ties go to the lower id.
    #[must_use]
    pub fn nearest(clusters: &[Cluster], points: &[DataPoint]) -> Self {
        let labels = points
            .iter()
            .map(|point| {
                clusters
                    .iter()
                    .min_by_key(|cluster| OrderedFloat(cluster.center.distance_sq(point.position())))
                    .map(|cluster| cluster.id)
            })
            .collect();
        Self { labels }
    }

    /// Number of points labelled with `cluster`.
    #[must_use]
    pub fn count(&self, cluster: usize) -> usize {
        self.labels.iter().filter(|l| **l == Some(cluster)).count()
    }
}

/// Everything a run produced, handed to observers when it finishes.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub phase: EnginePhase,
    pub instances_completed: u32,
    /// Iterations executed across all instances.
    pub iterations: u64,
    pub cancelled: bool,
    pub running_minimum: Option<(Position, f64)>,
    pub results: ResultSet,
    pub clusters: Vec<Cluster>,
    pub assignment: ClusterAssignment,
}
