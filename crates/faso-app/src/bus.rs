use crossfire::mpmc;
use crossfire::{MAsyncTx, MRx, TrySendError, detect_backoff_cfg};
use faso_core::{Snapshot, SnapshotObserver};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, warn};

pub type SnapshotSender = MAsyncTx<Snapshot>;
pub type SnapshotReceiver = MRx<Snapshot>;

/// Bounded channel carrying snapshots off the engine worker.
pub fn create_snapshot_bus(capacity: usize) -> (SnapshotSender, SnapshotReceiver) {
    detect_backoff_cfg();
    mpmc::bounded_tx_async_rx_blocking(capacity.max(1))
}

/// Observer that pushes snapshots into the bus without ever blocking the engine.
///
/// A full queue drops the snapshot; the engine keeps running.
pub struct ChannelObserver {
    sender: SnapshotSender,
    dropped: Arc<AtomicUsize>,
}

impl ChannelObserver {
    #[must_use]
    pub fn new(sender: SnapshotSender) -> Self {
        Self {
            sender,
            dropped: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Shared counter of snapshots dropped because the consumer fell behind.
    #[must_use]
    pub fn dropped_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.dropped)
    }
}

impl SnapshotObserver for ChannelObserver {
    fn on_snapshot(&mut self, snapshot: Snapshot) {
        match self.sender.try_send(snapshot) {
            Ok(()) => {}
            Err(TrySendError::Full(snapshot)) => {
                let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                if dropped == 1 {
                    warn!(
                        instance = snapshot.instance,
                        iteration = snapshot.iteration,
                        "snapshot queue full; dropping snapshots until the consumer catches up"
                    );
                } else {
                    debug!(dropped, iteration = snapshot.iteration, "snapshot dropped");
                }
            }
            Err(TrySendError::Disconnected(snapshot)) => {
                debug!(
                    iteration = snapshot.iteration,
                    "snapshot consumer disconnected"
                );
            }
        }
    }
}
