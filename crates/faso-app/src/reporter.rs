//! Headless snapshot consumer standing in for a visualizer.

use anyhow::{Result, anyhow};
use std::thread;
use tracing::debug;

use crate::bus::SnapshotReceiver;

/// What the reporter saw by the time the bus closed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReporterSummary {
    pub snapshots: usize,
    pub last_instance: Option<u32>,
    pub last_iteration: Option<u32>,
    pub last_mean_happiness: Option<f64>,
}

/// Drains the snapshot bus on its own thread until every sender is gone.
pub struct SnapshotReporter {
    handle: thread::JoinHandle<ReporterSummary>,
}

impl SnapshotReporter {
    pub fn spawn(receiver: SnapshotReceiver) -> Result<Self> {
        let handle = thread::Builder::new()
            .name("faso-snapshot-reporter".into())
            .spawn(move || {
                let mut summary = ReporterSummary::default();
                while let Ok(snapshot) = receiver.recv() {
                    let count = snapshot.agents.len().max(1) as f64;
                    let mean = snapshot.agents.iter().map(|a| a.happiness).sum::<f64>() / count;
                    debug!(
                        instance = snapshot.instance,
                        iteration = snapshot.iteration,
                        agents = snapshot.agents.len(),
                        mean_happiness = mean,
                        "snapshot"
                    );
                    summary.snapshots += 1;
                    summary.last_instance = Some(snapshot.instance);
                    summary.last_iteration = Some(snapshot.iteration);
                    summary.last_mean_happiness = Some(mean);
                }
                summary
            })?;
        Ok(Self { handle })
    }

    /// Wait for the bus to close and return the tally.
    pub fn join(self) -> Result<ReporterSummary> {
        self.handle
            .join()
            .map_err(|_| anyhow!("snapshot reporter thread panicked"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::{ChannelObserver, create_snapshot_bus};
    use faso_core::{Dataset, SwarmConfig, SwarmEngine, SwarmSize};

    #[test]
    fn reporter_sees_every_snapshot_and_stops_when_engine_drops() {
        let (tx, rx) = create_snapshot_bus(1_024);
        let reporter = SnapshotReporter::spawn(rx).expect("spawn");
        {
            let config = SwarmConfig {
                iterations: 6,
                swarm_size: SwarmSize::Fixed(3),
                snapshot_interval: 2,
                rng_seed: Some(4),
                ..SwarmConfig::default()
            };
            let data = Dataset::from_pairs(&[(0.0, 0.0), (1.0, 0.0), (0.0, 1.0), (2.0, 2.0)]);
            let mut engine = SwarmEngine::new(config, data)
                .expect("engine")
                .with_observer(Box::new(ChannelObserver::new(tx)));
            engine.run().expect("run");
        }
        let summary = reporter.join().expect("join");
        assert_eq!(summary.snapshots, 4);
        assert_eq!(summary.last_iteration, Some(5));
        assert_eq!(summary.last_instance, Some(0));
    }
}
