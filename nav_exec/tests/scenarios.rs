//! End to end scenarios across planning and tracking

use std::{
    fs,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use rand::{rngs::StdRng, SeedableRng};

use nav_lib::{
    ga::{
        checkpoint, evaluate_fitness, CheckpointEntry, CheckpointWriter, Chromosome, GaParams,
        GaReport, GaRunner, Population, RespawnPolicy,
    },
    geom::Point2D,
    map::{DangerMap, Obstacle, Terrain, TerrainParams},
    traj_ctrl::{PidController, TrajCtrl, TrajCtrlParams, VehicleState},
};

// ------------------------------------------------------------------------------------------------
// HELPERS
// ------------------------------------------------------------------------------------------------

fn chromosome(coords: &[(f64, f64)]) -> Chromosome {
    Chromosome::new(coords.iter().map(|&(x, y)| Point2D::new(x, y)).collect()).unwrap()
}

fn small_params() -> GaParams {
    GaParams {
        start: [20.0, 20.0],
        end: [380.0, 180.0],
        population_size: 24,
        num_generations: 12,
        length_samples: 30,
        danger_samples: 30,
        projection_resolution: 30,
        seed: Some(17),
        ..GaParams::default()
    }
}

/// A 400x200 map with two obstacles and a danger field generated from them
fn small_terrain() -> Terrain {
    let extent = Point2D::new(400.0, 200.0);
    let obstacles = vec![
        Obstacle::new(Point2D::new(150.0, 80.0), 25.0),
        Obstacle::new(Point2D::new(270.0, 130.0), 20.0),
    ];
    let danger = DangerMap::from_obstacles(&obstacles, extent, 10.0, 30.0).unwrap();

    Terrain::new(extent, obstacles, danger)
}

fn run(params: GaParams) -> GaReport {
    let mut rng = StdRng::seed_from_u64(params.seed.unwrap());
    GaRunner::new(params)
        .unwrap()
        .run(&small_terrain(), &mut rng, |_| ())
        .unwrap()
}

// ------------------------------------------------------------------------------------------------
// PLANNING
// ------------------------------------------------------------------------------------------------

#[test]
fn single_chromosome_without_obstacles_scores_length_weight() {
    let params = GaParams::default();
    let c = chromosome(&[(0.0, 0.0), (50.0, 50.0), (100.0, 0.0)]);

    let fitness = evaluate_fitness(&[c], &DangerMap::zeros(), &params).unwrap();

    assert_eq!(fitness, vec![params.length_weight * 1.0]);
}

#[test]
fn chromosome_through_obstacle_is_removed() {
    let c = chromosome(&[(0.0, 0.0), (50.0, 50.0), (100.0, 0.0)]);

    // Centre the obstacle on the curve's midpoint
    let mid = c.to_curve().unwrap().evaluate(0.5);
    let obstacles = [Obstacle::new(mid, 5.0)];

    let mut pop = Population::from_chromosomes(
        GaParams {
            start: [0.0, 0.0],
            end: [100.0, 0.0],
            ..GaParams::default()
        },
        Point2D::new(1500.0, 800.0),
        vec![c],
    )
    .unwrap();

    assert_eq!(pop.validate(&obstacles), 1);
    assert!(pop.is_empty());
}

#[test]
fn elites_are_never_worse_than_non_elites() {
    let mut rng = StdRng::seed_from_u64(2);
    let terrain = small_terrain();
    let mut pop = Population::new(small_params(), terrain.extent).unwrap();
    pop.initialise(&mut rng);
    pop.evaluate(&terrain.danger).unwrap();

    let elites = pop.select_elites().unwrap();
    let fitness = pop.fitness().unwrap();

    assert_eq!(elites.len(), (24.0 * 0.3_f64).floor() as usize);

    let worst_elite = elites
        .indices()
        .iter()
        .map(|&i| fitness[i])
        .fold(f64::NEG_INFINITY, f64::max);
    for (i, f) in fitness.iter().enumerate() {
        if !elites.contains(i) {
            assert!(worst_elite <= *f);
        }
    }
}

#[test]
fn seeded_runs_are_reproducible() {
    let a = run(small_params());
    let b = run(small_params());

    assert_eq!(a.best, b.best);
    assert_eq!(a.best_fitness, b.best_fitness);
    assert_eq!(a.generations, b.generations);

    let fitness = |r: &GaReport| {
        r.history
            .iter()
            .map(|s| (s.best_fitness, s.mean_fitness, s.population))
            .collect::<Vec<_>>()
    };
    assert_eq!(fitness(&a), fitness(&b));
}

#[test]
fn best_path_avoids_obstacles() {
    let report = run(small_params());
    let curve = report.best.to_curve().unwrap();

    for obs in small_terrain().obstacles.iter() {
        assert!(
            curve
                .project_with_resolution(&obs.position, 30)
                .unwrap()
                .distance
                > obs.radius
        );
    }
}

#[test]
fn respawn_keeps_size_and_shrink_never_grows() {
    let respawn = run(GaParams {
        respawn_policy: RespawnPolicy::Respawn,
        ..small_params()
    });
    for stats in respawn.history.iter() {
        assert_eq!(stats.population, 24);
        assert_eq!(stats.respawned, stats.removed);
    }

    let shrink = run(GaParams {
        respawn_policy: RespawnPolicy::Shrink,
        mutation_ratio: 0.5,
        ..small_params()
    });
    for w in shrink.history.windows(2) {
        assert_eq!(w[1].population, w[0].population - w[0].removed);
    }
    for stats in shrink.history.iter() {
        assert_eq!(stats.respawned, 0);
    }
}

#[test]
fn cancelled_run_checkpoints_best() {
    let path = std::env::temp_dir().join("nav_scenario_cancelled_run.txt");
    let _ = fs::remove_file(&path);

    let params = GaParams {
        num_generations: 1000,
        ..small_params()
    };
    let mut rng = StdRng::seed_from_u64(5);
    let flag = Arc::new(AtomicBool::new(false));
    let stopper = flag.clone();

    let mut runner = GaRunner::new(params)
        .unwrap()
        .with_cancel(flag)
        .with_checkpoint(CheckpointWriter::open(&path).unwrap());

    let report = runner
        .run(&small_terrain(), &mut rng, |stats| {
            if stats.generation == 2 {
                stopper.store(true, Ordering::Relaxed);
            }
        })
        .unwrap();

    assert!(report.cancelled);
    assert_eq!(report.generations, 3);

    // One entry per generation, then the overall best
    let entries = checkpoint::load(&path).unwrap();
    assert_eq!(entries.len(), 4);
    assert_eq!(
        checkpoint::load_best(&path).unwrap(),
        CheckpointEntry::new(3, report.best.clone())
    );
}

#[test]
fn checkpoint_round_trip() {
    let path = std::env::temp_dir().join("nav_scenario_checkpoint_round_trip.txt");
    let mut rng = StdRng::seed_from_u64(9);
    let params = GaParams::default();

    let entries: Vec<CheckpointEntry> = (0..10)
        .map(|i| {
            let c = Chromosome::random(
                &mut rng,
                params.start(),
                params.end(),
                1 + i % 4,
                Point2D::new(1500.0, 800.0),
            );
            CheckpointEntry::new(5, c)
        })
        .collect();

    checkpoint::save(&path, &entries).unwrap();

    assert_eq!(checkpoint::load(&path).unwrap(), entries);
}

#[test]
fn terrain_loads_from_files() {
    let dir = std::env::temp_dir().join("nav_scenario_terrain");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("obstacles.txt"), "# x y r\n100 100 20\n300 50 10\n").unwrap();
    fs::write(dir.join("danger.txt"), "0 0.5\n1 0\n").unwrap();

    let params = TerrainParams {
        width: 400.0,
        height: 200.0,
        cell_size: 100.0,
        obstacles_file: "obstacles.txt".into(),
        danger_map_file: Some("danger.txt".into()),
        ..TerrainParams::default()
    };

    let terrain = Terrain::load(&params, &dir).unwrap();

    assert_eq!(terrain.obstacles.len(), 2);
    assert_eq!(terrain.danger(&Point2D::new(150.0, 50.0)), 0.5);
    assert_eq!(terrain.danger(&Point2D::new(50.0, 150.0)), 1.0);
    assert_eq!(terrain.danger(&Point2D::new(350.0, 50.0)), 0.0);

    // Without a danger map file the danger comes from the obstacles
    let generated = Terrain::load(
        &TerrainParams {
            danger_map_file: None,
            cell_size: 10.0,
            ..params
        },
        &dir,
    )
    .unwrap();
    assert_eq!(generated.danger(&Point2D::new(105.0, 105.0)), 1.0);
}

// ------------------------------------------------------------------------------------------------
// TRACKING
// ------------------------------------------------------------------------------------------------

fn straight_curve() -> nav_lib::geom::BezierCurve {
    nav_lib::geom::BezierCurve::new(vec![
        Point2D::new(0.0, 0.0),
        Point2D::new(1000.0, 0.0),
        Point2D::new(2000.0, 0.0),
    ])
    .unwrap()
}

#[test]
fn on_path_tick_keeps_heading() {
    let mut ctrl = TrajCtrl::new(TrajCtrlParams::default(), straight_curve()).unwrap();
    let mut pid = PidController::from_params(ctrl.params());
    let state = VehicleState::new(Point2D::new(500.0, 0.0), 0.0);

    let out = ctrl.proc(&state, &mut pid).unwrap();

    assert_eq!(out.omega, 0.0);
    assert_eq!(out.state.heading_rad, state.heading_rad);
}

#[test]
fn controller_converges_onto_straight_path() {
    let mut ctrl = TrajCtrl::new(TrajCtrlParams::default(), straight_curve()).unwrap();
    let mut pid = PidController::from_params(ctrl.params());
    let mut state = VehicleState::new(Point2D::new(0.0, 20.0), 0.0);

    let mut lateral = Vec::new();
    for _ in 0..900 {
        state = ctrl.proc(&state, &mut pid).unwrap().state;
        lateral.push(state.position[1]);
    }

    let settled = lateral[400..]
        .iter()
        .fold(0.0_f64, |acc, y| acc.max(y.abs()));
    assert!(settled < 2.0, "settled lateral offset {}", settled);
    assert!(state.position[0] > 1000.0);
}

#[test]
fn tracker_reaches_goal_of_curved_path() {
    let curve = chromosome(&[(20.0, 20.0), (200.0, 0.0), (200.0, 200.0), (380.0, 180.0)])
        .to_curve()
        .unwrap();

    let mut ctrl = TrajCtrl::new(TrajCtrlParams::default(), curve).unwrap();
    let mut pid = PidController::from_params(ctrl.params());
    let mut state = ctrl.initial_state();

    assert_eq!(state.position, Point2D::new(20.0, 20.0));

    let reached = (0..1000).any(|_| {
        state = ctrl.proc(&state, &mut pid).unwrap().state;
        ctrl.goal_reached(&state)
    });

    assert!(reached, "stopped at {:?}", state.position);
}
