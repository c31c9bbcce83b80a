//! Application plumbing for the `faso` binary: argument handling, the snapshot
//! bus between the engine worker and its consumer, and the headless reporter.

pub mod bus;
pub mod cli;
pub mod reporter;

pub use bus::{ChannelObserver, SnapshotReceiver, SnapshotSender, create_snapshot_bus};
pub use cli::{Cli, Command, RunArgs};
pub use reporter::{ReporterSummary, SnapshotReporter};
