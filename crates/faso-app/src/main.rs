use anyhow::{Context, Result, anyhow};
use clap::Parser;
use faso_app::{ChannelObserver, Cli, Command, SnapshotReporter, create_snapshot_bus};
use faso_core::{Dataset, NullResultSink, ResultSink, RunReport, SwarmEngine};
use faso_storage::{ResultDestination, ResultPipeline, load_dataset};
use std::sync::atomic::Ordering;
use std::thread;
use tracing::info;

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    run(cli.command)
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();
}

fn run(command: Command) -> Result<()> {
    let config = command.swarm_config()?;
    let (dataset, sink): (Dataset, Box<dyn ResultSink>) = match &command {
        Command::Cluster { data, .. } => (
            load_dataset(data).with_context(|| format!("failed to load {}", data.display()))?,
            Box::new(NullResultSink),
        ),
        Command::Optimize { output, .. } => {
            let pipeline = ResultPipeline::open_or_stdout(output)?;
            if let ResultDestination::File(path) = pipeline.destination() {
                info!(path = %path.display(), "writing results");
            }
            (Dataset::empty(), Box::new(pipeline))
        }
    };

    let (tx, rx) = create_snapshot_bus(command.run_args().snapshot_capacity);
    let observer = ChannelObserver::new(tx);
    let dropped = observer.dropped_counter();
    let reporter = SnapshotReporter::spawn(rx)?;

    let engine = SwarmEngine::new(config, dataset)
        .context("invalid swarm configuration")?
        .with_observer(Box::new(observer))
        .with_result_sink(sink);

    let worker = thread::Builder::new()
        .name("faso-engine".into())
        .spawn(move || {
            let mut engine = engine;
            engine.run()
        })?;
    let report = worker
        .join()
        .map_err(|_| anyhow!("engine thread panicked"))?
        .context("swarm run failed")?;
    let seen = reporter.join()?;

    info!(
        snapshots = seen.snapshots,
        dropped = dropped.load(Ordering::Relaxed),
        instances = report.instances_completed,
        iterations = report.iterations,
        cancelled = report.cancelled,
        "run finished"
    );
    if matches!(command, Command::Cluster { .. }) {
        print_clusters(&report);
    } else if let Some((position, value)) = report.running_minimum {
        info!(x = position.x, y = position.y, value, "lowest landscape value found");
    }
    Ok(())
}

fn print_clusters(report: &RunReport) {
    println!("cluster,x,y,agents,points");
    for cluster in &report.clusters {
        println!(
            "{},{},{},{},{}",
            cluster.id,
            cluster.center.x,
            cluster.center.y,
            cluster.members.len(),
            report.assignment.count(cluster.id)
        );
    }
}
