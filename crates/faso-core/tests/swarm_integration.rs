use faso_core::{
    Bounds, CallbackObserver, CancellationToken, Dataset, EnginePhase, InstanceResult,
    IterationSummary, LandscapeFunction, Position, ResultSink, Snapshot, SwarmConfig, SwarmEngine,
    SwarmError, SwarmSize,
};
use std::sync::{Arc, Mutex};

fn two_blobs() -> Dataset {
    let mut pairs = Vec::new();
    for i in 0..30 {
        let t = i as f64;
        pairs.push(((t * 0.37).sin() * 0.4, (t * 0.91).cos() * 0.4));
        pairs.push((6.0 + (t * 0.53).cos() * 0.5, 4.0 + (t * 0.29).sin() * 0.5));
    }
    Dataset::from_pairs(&pairs)
}

fn run_history(config: SwarmConfig, data: Dataset) -> (Vec<IterationSummary>, Vec<Position>) {
    let mut engine = SwarmEngine::new(config, data).expect("engine");
    engine.run().expect("run");
    let history = engine.history().cloned().collect();
    (history, engine.population().positions())
}

#[derive(Clone, Default)]
struct CollectingSink {
    instances: Arc<Mutex<Vec<InstanceResult>>>,
    completed: Arc<Mutex<bool>>,
}

impl ResultSink for CollectingSink {
    fn on_instance(&mut self, result: &InstanceResult) {
        self.instances.lock().expect("lock").push(result.clone());
    }

    fn on_complete(&mut self) {
        *self.completed.lock().expect("lock") = true;
    }
}

#[test]
fn agents_stay_inside_data_bounds() {
    let data = two_blobs();
    let bounds = data.bounds().expect("bounds");
    let violations = Arc::new(Mutex::new(0usize));
    let seen = Arc::clone(&violations);
    let observer = CallbackObserver::new(move |snapshot: Snapshot| {
        let outside = snapshot
            .agents
            .iter()
            .filter(|a| !bounds.contains(a.position))
            .count();
        let bad_ranges = snapshot
            .agents
            .iter()
            .filter(|a| !(0.0 <= a.crowding_range && a.crowding_range <= a.foraging_range))
            .count();
        *seen.lock().expect("lock") += outside + bad_ranges;
    });
    let config = SwarmConfig {
        iterations: 60,
        rng_seed: Some(21),
        ..SwarmConfig::default()
    };
    let mut engine = SwarmEngine::new(config, data)
        .expect("engine")
        .with_observer(Box::new(observer));
    engine.run().expect("run");
    assert_eq!(*violations.lock().expect("lock"), 0);
    assert!(engine.population().iter().all(|a| bounds.contains(a.position)));
}

#[test]
fn seeded_runs_are_bit_identical() {
    let config = SwarmConfig {
        iterations: 40,
        rng_seed: Some(0xFA50),
        ..SwarmConfig::default()
    };
    let (history_a, final_a) = run_history(config.clone(), two_blobs());
    let (history_b, final_b) = run_history(config.clone(), two_blobs());
    assert_eq!(history_a, history_b);
    assert_eq!(final_a, final_b);

    let reseeded = SwarmConfig {
        rng_seed: Some(0xFA51),
        ..config
    };
    let (_, final_c) = run_history(reseeded, two_blobs());
    assert_ne!(final_a, final_c);

    let landscape = SwarmConfig {
        iterations: 25,
        instances: 2,
        swarm_size: SwarmSize::Fixed(12),
        rng_seed: Some(3),
        ..SwarmConfig::landscape(LandscapeFunction::StyblinskiTang)
    };
    assert_eq!(
        run_history(landscape.clone(), Dataset::empty()),
        run_history(landscape, Dataset::empty())
    );
}

#[test]
fn iteration_delay_does_not_change_results() {
    let config = SwarmConfig {
        iterations: 5,
        swarm_size: SwarmSize::Fixed(8),
        rng_seed: Some(8),
        ..SwarmConfig::default()
    };
    let paced = SwarmConfig {
        iteration_delay_ms: 1,
        ..config.clone()
    };
    assert_eq!(
        run_history(config, two_blobs()),
        run_history(paced, two_blobs())
    );
}

#[test]
fn lone_agent_in_unit_square_heads_for_data() {
    let data = Dataset::from_pairs(&[(0.0, 0.0), (1.0, 0.0), (0.0, 1.0), (1.0, 1.0)]);
    for seed in 0..16 {
        let config = SwarmConfig {
            iterations: 1,
            swarm_size: SwarmSize::Fixed(1),
            sensor_to_avg_dist_ratio: 2.0,
            rng_seed: Some(seed),
            ..SwarmConfig::default()
        };
        let mut engine = SwarmEngine::new(config, data.clone()).expect("engine");
        engine.run().expect("run");
        let summary = engine.history().next().expect("summary");
        assert_eq!(summary.moves.data_mean, 1, "seed {seed}");
        assert_eq!(summary.moves.total(), 1);
        let agent = engine.population().get(0).expect("agent");
        assert!(Bounds::new(0.0, 1.0, 0.0, 1.0).contains(agent.position));
    }
}

#[test]
fn convex_bowl_running_minimum_converges() {
    let config = SwarmConfig {
        iterations: 300,
        swarm_size: SwarmSize::Fixed(30),
        rng_seed: Some(11),
        ..SwarmConfig::landscape(LandscapeFunction::Sphere)
    };
    let mut engine = SwarmEngine::new(config, Dataset::empty()).expect("engine");
    let report = engine.run().expect("run");

    let minima: Vec<f64> = engine
        .history()
        .map(|s| s.running_minimum.expect("landscape minimum"))
        .collect();
    assert_eq!(minima.len(), 300);
    assert!(minima.windows(2).all(|w| w[1] <= w[0]));

    let (_, analytic) = LandscapeFunction::Sphere.known_minimum();
    let (argmin, best) = report.running_minimum.expect("minimum");
    assert!(best - analytic < 0.05, "best {best}");
    assert!(argmin.distance(Position::new(0.0, 0.0)) < 0.25);
}

#[test]
fn empty_inputs_are_rejected_before_converging() {
    let zero = SwarmConfig {
        swarm_size: SwarmSize::Fixed(0),
        ..SwarmConfig::default()
    };
    assert!(matches!(
        SwarmEngine::new(zero, two_blobs()),
        Err(SwarmError::EmptySwarm)
    ));
    assert!(matches!(
        SwarmEngine::new(SwarmConfig::default(), Dataset::empty()),
        Err(SwarmError::EmptyDataset)
    ));
    assert!(matches!(
        SwarmEngine::new(SwarmConfig::default(), Dataset::from_pairs(&[(1.0, 1.0)])),
        Err(SwarmError::EmptySwarm)
    ));
}

#[test]
fn each_instance_records_every_agent() {
    let sink = CollectingSink::default();
    let config = SwarmConfig {
        iterations: 5,
        instances: 3,
        swarm_size: SwarmSize::Fixed(7),
        rng_seed: Some(5),
        ..SwarmConfig::landscape(LandscapeFunction::Ackley)
    };
    let mut engine = SwarmEngine::new(config, Dataset::empty())
        .expect("engine")
        .with_result_sink(Box::new(sink.clone()));
    let report = engine.run().expect("run");

    assert_eq!(report.instances_completed, 3);
    assert_eq!(report.iterations, 15);
    assert_eq!(report.results.len(), 21);
    for instance in 0..3 {
        assert_eq!(report.results.instance(instance).count(), 7);
    }
    let delivered = sink.instances.lock().expect("lock");
    assert_eq!(delivered.len(), 3);
    assert_ne!(delivered[0].positions, delivered[1].positions);
    assert!(*sink.completed.lock().expect("lock"));
    let bounds = Bounds::symmetric(5.0);
    assert!(report
        .results
        .rows()
        .iter()
        .all(|row| bounds.contains(Position::new(row.x, row.y))));
}

#[test]
fn cancellation_stops_at_iteration_boundary() {
    let token = CancellationToken::new();
    token.cancel();
    let mut engine = SwarmEngine::new(SwarmConfig::default(), two_blobs())
        .expect("engine")
        .with_cancellation(token);
    let report = engine.run().expect("run");
    assert!(report.cancelled);
    assert_eq!(report.phase, EnginePhase::Completed);
    assert_eq!(report.iterations, 0);
    assert!(report.results.is_empty());
    assert!(report.clusters.is_empty());

    let config = SwarmConfig {
        iterations: 50,
        instances: 2,
        rng_seed: Some(6),
        ..SwarmConfig::default()
    };
    let engine = SwarmEngine::new(config, two_blobs()).expect("engine");
    let trigger = engine.cancellation_token();
    let observer = CallbackObserver::new(move |snapshot: Snapshot| {
        if snapshot.iteration == 4 {
            trigger.cancel();
        }
    });
    let mut engine = engine.with_observer(Box::new(observer));
    let report = engine.run().expect("run");
    assert!(report.cancelled);
    assert_eq!(report.iterations, 5);
    assert_eq!(report.instances_completed, 0);
}

#[test]
fn non_finite_move_fails_the_run() {
    let config = SwarmConfig {
        iterations: 10,
        swarm_size: SwarmSize::Fixed(6),
        landscape_sensor_range: f64::MAX,
        random_move_factor: f64::MAX,
        rng_seed: Some(4),
        ..SwarmConfig::landscape(LandscapeFunction::Sphere)
    };
    let mut engine = SwarmEngine::new(config, Dataset::empty()).expect("engine");
    let err = engine.run().expect_err("overflowing move must fail");
    assert!(
        matches!(err, SwarmError::NumericInstability { .. }),
        "unexpected error {err:?}"
    );
    assert_eq!(engine.phase(), EnginePhase::Failed);
    assert!(matches!(
        engine.finish(),
        Err(SwarmError::InvalidPhase {
            current: EnginePhase::Failed,
            ..
        })
    ));
    assert!(engine.consolidate().is_err());
}

#[test]
fn snapshots_follow_interval() {
    fn emitted(interval: u32) -> Vec<u32> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let config = SwarmConfig {
            iterations: 10,
            snapshot_interval: interval,
            swarm_size: SwarmSize::Fixed(4),
            rng_seed: Some(1),
            ..SwarmConfig::default()
        };
        let mut engine = SwarmEngine::new(config, two_blobs())
            .expect("engine")
            .with_observer(Box::new(CallbackObserver::new(
                move |snapshot: Snapshot| {
                    assert_eq!(snapshot.agents.len(), 4);
                    assert_eq!(snapshot.data.len(), 60);
                    assert_eq!(snapshot.phase, EnginePhase::Converging);
                    sink.lock().expect("lock").push(snapshot.iteration);
                },
            )));
        engine.run().expect("run");
        seen.lock().expect("lock").clone()
    }

    assert_eq!(emitted(1), (0..10).collect::<Vec<_>>());
    assert_eq!(emitted(3), vec![0, 3, 6, 9]);
    assert_eq!(emitted(4), vec![0, 4, 8, 9]);
    assert!(emitted(0).is_empty());
}

#[test]
fn finishers_cluster_the_blobs() {
    let config = SwarmConfig {
        iterations: 80,
        rng_seed: Some(13),
        ..SwarmConfig::default()
    };
    let mut engine = SwarmEngine::new(config, two_blobs()).expect("engine");
    engine.initialize().expect("initialize");
    engine.converge().expect("converge");
    assert_eq!(engine.phase(), EnginePhase::Converging);
    engine.consolidate().expect("consolidate");
    assert_eq!(engine.phase(), EnginePhase::Consolidating);
    engine.assign().expect("assign");
    let report = engine.finish().expect("finish");

    assert!(!report.clusters.is_empty());
    let members: usize = report.clusters.iter().map(|c| c.members.len()).sum();
    assert_eq!(members, 30);
    assert_eq!(report.assignment.labels.len(), 60);
    let labelled: usize = report
        .clusters
        .iter()
        .map(|c| report.assignment.count(c.id))
        .sum();
    assert_eq!(labelled, 60);
}
