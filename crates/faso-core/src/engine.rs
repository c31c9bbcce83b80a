//! The swarm state machine and its convergence loop.
//!
//! `Uninitialized → Initialized → Converging → Consolidating → Assigning → Completed`,
//! with `Failed` reachable from any phase when the model state becomes unusable.

use rand::rngs::SmallRng;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;
use tracing::{info, trace, warn};

use crate::SwarmError;
use crate::config::{StrategyConfig, SwarmConfig};
use crate::fitness::{DensityStrategy, FitnessStrategy, HappinessEvaluator, LandscapeStrategy};
use crate::geometry::Bounds;
use crate::model::{Dataset, Population};
use crate::motion::MotionPlanner;
use crate::ranges::{DomainScale, RangeAdapter};
use crate::report::{
    Cluster, ClusterAssignment, InstanceResult, IterationSummary, MoveTally, ResultSet, RunReport,
};
use crate::snapshot::{NullObserver, NullResultSink, ResultSink, Snapshot, SnapshotObserver};
use crate::spatial::SpatialQuery;

/// Lifecycle phase of a [`SwarmEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnginePhase {
    #[default]
    Uninitialized,
    Initialized,
    Converging,
    Consolidating,
    Assigning,
    Completed,
    Failed,
}

impl EnginePhase {
    fn can_enter(self, next: Self) -> bool {
        use EnginePhase::*;
        matches!(
            (self, next),
            (Uninitialized, Initialized)
                | (Initialized, Converging)
                | (Converging, Consolidating)
                | (Consolidating, Assigning)
                | (Converging | Consolidating | Assigning, Completed)
        )
    }
}

/// Shared flag requesting an orderly stop at the next iteration boundary.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Owns the population and drives every phase of a run.
pub struct SwarmEngine {
    config: SwarmConfig,
    phase: EnginePhase,
    bounds: Bounds,
    scale: DomainScale,
    swarm_size: usize,
    spatial: SpatialQuery,
    strategy: Box<dyn FitnessStrategy>,
    evaluator: HappinessEvaluator,
    adapter: RangeAdapter,
    planner: MotionPlanner,
    population: Population,
    rng: SmallRng,
    observer: Box<dyn SnapshotObserver>,
    sink: Box<dyn ResultSink>,
    cancel: CancellationToken,
    history: VecDeque<IterationSummary>,
    results: ResultSet,
    clusters: Vec<Cluster>,
    assignment: ClusterAssignment,
    instances_completed: u32,
    iterations_run: u64,
    cancelled: bool,
}

impl fmt::Debug for SwarmEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SwarmEngine")
            .field("phase", &self.phase)
            .field("swarm_size", &self.swarm_size)
            .field("data_len", &self.spatial.data_len())
            .field("scale", &self.scale)
            .field("instances_completed", &self.instances_completed)
            .finish()
    }
}

impl SwarmEngine {
    /// Validate the configuration against the dataset and derive the run geometry.
    ///
    /// Fails before any agent exists when the swarm or (in clustering mode) the dataset is empty.
    pub fn new(config: SwarmConfig, dataset: Dataset) -> Result<Self, SwarmError> {
        config.validate()?;
        let swarm_size = config.resolve_swarm_size(dataset.len())?;
        let (bounds, strategy): (Bounds, Box<dyn FitnessStrategy>) = match config.strategy {
            StrategyConfig::Density => {
                let bounds = dataset.bounds().ok_or(SwarmError::EmptyDataset)?;
                (bounds, Box::new(DensityStrategy::new()))
            }
            StrategyConfig::Landscape { function } => (
                config.landscape_bounds,
                Box::new(LandscapeStrategy::new(function, config.landscape_epsilon)),
            ),
        };
        let scale = DomainScale::derive(&config, &dataset);
        let spatial = SpatialQuery::new(dataset, config.data_index, scale.sensor_range)?;
        let evaluator = HappinessEvaluator::new(config.crowding_aversion_factor);
        let adapter = RangeAdapter::new(&scale, config.beta, config.crowding_to_forage_ratio);
        let planner =
            MotionPlanner::new(config.random_move_factor, scale.step_size, evaluator, bounds);
        let rng = config.seeded_rng();
        let history = VecDeque::with_capacity(config.history_capacity.min(4_096));

        info!(
            agents = swarm_size,
            data_points = spatial.data_len(),
            sensor_range = scale.sensor_range,
            min_range = scale.min_range,
            landscape = config.strategy.is_landscape(),
            "swarm configured"
        );

        Ok(Self {
            config,
            phase: EnginePhase::Uninitialized,
            bounds,
            scale,
            swarm_size,
            spatial,
            strategy,
            evaluator,
            adapter,
            planner,
            population: Population::default(),
            rng,
            observer: Box::new(NullObserver),
            sink: Box::new(NullResultSink),
            cancel: CancellationToken::new(),
            history,
            results: ResultSet::default(),
            clusters: Vec::new(),
            assignment: ClusterAssignment::default(),
            instances_completed: 0,
            iterations_run: 0,
            cancelled: false,
        })
    }

    #[must_use]
    pub fn with_observer(mut self, observer: Box<dyn SnapshotObserver>) -> Self {
        self.observer = observer;
        self
    }

    #[must_use]
    pub fn with_result_sink(mut self, sink: Box<dyn ResultSink>) -> Self {
        self.sink = sink;
        self
    }

    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Handle that stops this engine when cancelled.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    fn enter(&mut self, next: EnginePhase) -> Result<(), SwarmError> {
        if !self.phase.can_enter(next) {
            return Err(SwarmError::InvalidPhase {
                current: self.phase,
                requested: next,
            });
        }
        self.phase = next;
        Ok(())
    }

    fn fail<T>(&mut self, result: Result<T, SwarmError>) -> Result<T, SwarmError> {
        if let Err(err) = &result
            && !matches!(err, SwarmError::InvalidPhase { .. })
        {
            warn!(error = %err, phase = ?self.phase, "swarm run failed");
            self.phase = EnginePhase::Failed;
        }
        result
    }

    /// Scatter the population uniformly inside the domain bounds.
    pub fn initialize(&mut self) -> Result<(), SwarmError> {
        self.enter(EnginePhase::Initialized)?;
        self.population = Population::scatter(
            self.swarm_size,
            &self.bounds,
            self.scale.sensor_range,
            self.config.crowding_to_forage_ratio,
            &mut self.rng,
        );
        Ok(())
    }

    /// Run every instance of the convergence loop.
    ///
    /// Each instance ends by recording every agent's position; the next one starts
    /// from a fresh scatter. The running landscape minimum carries over.
    pub fn converge(&mut self) -> Result<(), SwarmError> {
        self.enter(EnginePhase::Converging)?;
        let result = self.converge_instances();
        self.fail(result)
    }

    fn converge_instances(&mut self) -> Result<(), SwarmError> {
        for instance in 0..self.config.instances {
            if instance > 0 {
                self.population.rescatter(
                    &self.bounds,
                    self.scale.sensor_range,
                    self.config.crowding_to_forage_ratio,
                    &mut self.rng,
                );
            }
            for iteration in 0..self.config.iterations {
                if self.cancel.is_cancelled() {
                    info!(instance, iteration, "swarm run cancelled");
                    self.cancelled = true;
                    return Ok(());
                }
                self.iterate(instance, iteration)?;
                if self.config.iteration_delay_ms > 0 {
                    thread::sleep(Duration::from_millis(self.config.iteration_delay_ms));
                }
            }

            let result = InstanceResult {
                instance,
                positions: self.population.positions(),
            };
            self.sink.on_instance(&result);
            self.results.extend_from(&result);
            self.instances_completed += 1;
            info!(
                instance,
                running_minimum = self.running_minimum(),
                "instance converged"
            );
        }
        Ok(())
    }

    /// One pass: score, adapt ranges, move every agent in population order.
    fn iterate(&mut self, instance: u32, iteration: u32) -> Result<(), SwarmError> {
        let agents = self.population.as_mut_slice();
        self.evaluator
            .evaluate_all(&mut *self.strategy, agents, &self.spatial);
        self.adapter
            .adapt_all(&*self.strategy, agents, &self.spatial);

        let mut moves = MoveTally::default();
        for idx in 0..agents.len() {
            let kind = self.planner.step(
                agents,
                idx,
                &mut *self.strategy,
                &self.spatial,
                &mut self.rng,
            )?;
            moves.record(kind);
        }
        self.iterations_run += 1;

        let summary = IterationSummary::capture(
            instance,
            iteration,
            self.population.as_slice(),
            self.running_minimum(),
            moves,
        );
        trace!(
            instance,
            iteration,
            mean_happiness = summary.mean_happiness,
            mean_foraging_range = summary.mean_foraging_range,
            "iteration complete"
        );
        if self.history.len() >= self.config.history_capacity {
            self.history.pop_front();
        }
        self.history.push_back(summary);

        let interval = self.config.snapshot_interval;
        let last = iteration + 1 == self.config.iterations;
        if interval > 0 && (iteration.is_multiple_of(interval) || last) {
            self.emit_snapshot(instance, iteration);
        }
        Ok(())
    }

    fn emit_snapshot(&mut self, instance: u32, iteration: u32) {
        let snapshot = Snapshot {
            instance,
            iteration,
            phase: self.phase,
            agents: self.population.to_vec(),
            data: self.spatial.dataset().shared(),
        };
        self.observer.on_snapshot(snapshot);
    }

    /// Merge agents sitting close together into clusters. A no-op in landscape mode.
    pub fn consolidate(&mut self) -> Result<(), SwarmError> {
        self.enter(EnginePhase::Consolidating)?;
        if !self.config.strategy.is_landscape() {
            let radius = self.config.consolidation_radius_ratio * self.scale.sensor_range;
            self.clusters = Cluster::consolidate(self.population.as_slice(), radius);
            info!(clusters = self.clusters.len(), radius, "population consolidated");
        }
        Ok(())
    }

    /// Label every data point with its nearest cluster. A no-op in landscape mode.
    pub fn assign(&mut self) -> Result<(), SwarmError> {
        self.enter(EnginePhase::Assigning)?;
        if !self.config.strategy.is_landscape() {
            self.assignment =
                ClusterAssignment::nearest(&self.clusters, self.spatial.dataset().points());
        }
        Ok(())
    }

    /// Close the run: flush the result sink and notify the observer.
    pub fn finish(&mut self) -> Result<RunReport, SwarmError> {
        self.enter(EnginePhase::Completed)?;
        self.sink.on_complete();
        let report = self.report();
        self.observer.on_finished(&report);
        Ok(report)
    }

    /// Drive every phase in order. A cancelled run skips the finishers.
    pub fn run(&mut self) -> Result<RunReport, SwarmError> {
        self.initialize()?;
        self.converge()?;
        if !self.cancelled {
            self.consolidate()?;
            self.assign()?;
        }
        self.finish()
    }

    /// Summary of everything produced so far.
    #[must_use]
    pub fn report(&self) -> RunReport {
        RunReport {
            phase: self.phase,
            instances_completed: self.instances_completed,
            iterations: self.iterations_run,
            cancelled: self.cancelled,
            running_minimum: self.strategy.running_minimum(),
            results: self.results.clone(),
            clusters: self.clusters.clone(),
            assignment: self.assignment.clone(),
        }
    }

    fn running_minimum(&self) -> Option<f64> {
        self.strategy.running_minimum().map(|(_, value)| value)
    }

    #[must_use]
    pub const fn phase(&self) -> EnginePhase {
        self.phase
    }

    #[must_use]
    pub fn config(&self) -> &SwarmConfig {
        &self.config
    }

    #[must_use]
    pub fn population(&self) -> &Population {
        &self.population
    }

    #[must_use]
    pub const fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    #[must_use]
    pub const fn scale(&self) -> &DomainScale {
        &self.scale
    }

    #[must_use]
    pub fn results(&self) -> &ResultSet {
        &self.results
    }

    /// Iterate over retained iteration summaries, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &IterationSummary> {
        self.history.iter()
    }
}
