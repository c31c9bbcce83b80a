//! Core types shared across the FASO workspace: the agent model, fitness
//! strategies, and the engine that drives the convergence loop.

use faso_index::IndexError;
use thiserror::Error;

pub mod config;
pub mod engine;
pub mod fitness;
pub mod geometry;
pub mod landscape;
pub mod model;
pub mod motion;
pub mod ranges;
pub mod report;
pub mod snapshot;
pub mod spatial;

pub use config::{DataIndexKind, StrategyConfig, SwarmConfig, SwarmSize};
pub use engine::{CancellationToken, EnginePhase, SwarmEngine};
pub use fitness::{
    DensityStrategy, FitnessStrategy, HappinessEvaluator, LandscapeStrategy, ObjectiveSample,
    StrategyKind,
};
pub use geometry::{Bounds, Position};
pub use landscape::LandscapeFunction;
pub use model::{Agent, DataPoint, Dataset, PairwiseStats, Population};
pub use motion::{MoveKind, MotionPlanner};
pub use ranges::{DomainScale, RangeAdapter};
pub use report::{
    Cluster, ClusterAssignment, InstanceResult, IterationSummary, MoveTally, ResultRow, ResultSet,
    RunReport,
};
pub use snapshot::{
    CallbackObserver, NullObserver, NullResultSink, ResultSink, Snapshot, SnapshotObserver,
};
pub use spatial::SpatialQuery;

/// Errors raised while configuring or running a swarm.
#[derive(Debug, Error)]
pub enum SwarmError {
    /// Indicates an invalid configuration value.
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
    /// Clustering needs at least one data point.
    #[error("dataset is empty")]
    EmptyDataset,
    /// The resolved population would contain no agents.
    #[error("swarm size resolved to zero agents")]
    EmptySwarm,
    /// A computed coordinate was NaN or infinite; the model state is no longer trustworthy.
    #[error("numeric instability in {stage}: produced ({x}, {y})")]
    NumericInstability { stage: &'static str, x: f64, y: f64 },
    /// A phase was requested out of order.
    #[error("cannot enter {requested:?} from {current:?}")]
    InvalidPhase {
        current: EnginePhase,
        requested: EnginePhase,
    },
    /// The dataset index could not be built.
    #[error(transparent)]
    Index(#[from] IndexError),
}
