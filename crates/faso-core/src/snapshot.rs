//! Outbound hand-offs: snapshots for visualizers and results for persistence.

use std::sync::Arc;

use crate::engine::EnginePhase;
use crate::model::{Agent, DataPoint};
use crate::report::{InstanceResult, RunReport};

/// Point-in-time copy of the population. Agents are deep-copied; the dataset is shared read-only.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub instance: u32,
    pub iteration: u32,
    pub phase: EnginePhase,
    pub agents: Vec<Agent>,
    pub data: Arc<[DataPoint]>,
}

/// Receives snapshots pushed by the engine. Implementations must not block the engine.
pub trait SnapshotObserver: Send {
    fn on_snapshot(&mut self, snapshot: Snapshot);

    /// Called once after the run leaves the engine, successful or cancelled.
    fn on_finished(&mut self, _report: &RunReport) {}
}

/// Observer that drops everything.
#[derive(Debug, Default)]
pub struct NullObserver;

impl SnapshotObserver for NullObserver {
    fn on_snapshot(&mut self, _snapshot: Snapshot) {}
}

/// Adapts a closure into an observer.
pub struct CallbackObserver<F> {
    callback: F,
}

impl<F> CallbackObserver<F>
where
    F: FnMut(Snapshot) + Send,
{
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> SnapshotObserver for CallbackObserver<F>
where
    F: FnMut(Snapshot) + Send,
{
    fn on_snapshot(&mut self, snapshot: Snapshot) {
        (self.callback)(snapshot);
    }
}

impl<F> std::fmt::Debug for CallbackObserver<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackObserver").finish_non_exhaustive()
    }
}

/// Persistence sink invoked after each instance completes.
pub trait ResultSink: Send {
    fn on_instance(&mut self, result: &InstanceResult);

    /// Flush once the run is over.
    fn on_complete(&mut self) {}
}

/// No-op result sink.
#[derive(Debug, Default)]
pub struct NullResultSink;

impl ResultSink for NullResultSink {
    fn on_instance(&mut self, _result: &InstanceResult) {}
}
