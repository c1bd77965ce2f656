//! # GA Path Planner
//!
//! Runs the genetic optimizer over the terrain described by `terrain.toml`,
//! using the parameters in `ga.toml`. The best chromosomes are appended to a
//! checkpoint file, by default `$BEZIER_NAV_ROOT/data/best_chromosome.txt`,
//! which can be given as the only argument instead.
//!
//! Press enter while the optimizer is running to stop it early. The best
//! chromosome found so far is still checkpointed.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{
    env, io,
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
};

use color_eyre::{
    eyre::{eyre, WrapErr},
    Result,
};
use log::{debug, info, warn};
use rand::{rngs::StdRng, SeedableRng};

use nav_lib::{
    ga::{CheckpointWriter, GaParams, GaRunner},
    map::{generate_obstacles, save_obstacles, DangerMap, Terrain, TerrainParams},
};
use util::{
    archive::Archiver,
    host,
    logger::{logger_init, LevelFilter},
    session::Session,
};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Checkpoint file name inside the data directory
const DEFAULT_CHECKPOINT: &str = "best_chromosome.txt";

// ------------------------------------------------------------------------------------------------
// MAIN
// ------------------------------------------------------------------------------------------------

fn main() -> Result<()> {
    color_eyre::install()?;

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new("ga_plan", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Debug, &session).wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("GA Path Planner\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let ga_params: GaParams =
        util::params::load("ga.toml").wrap_err("Could not load GA params")?;
    let terrain_params: TerrainParams =
        util::params::load("terrain.toml").wrap_err("Could not load terrain params")?;

    debug!("GA params: {:#?}", ga_params);
    debug!("Terrain params: {:#?}", terrain_params);

    let data_dir = host::get_nav_sw_root()
        .wrap_err("Could not find the software root")?
        .join("data");

    let args: Vec<String> = env::args().collect();
    let checkpoint_path = match args.len() {
        1 => data_dir.join(DEFAULT_CHECKPOINT),
        2 => PathBuf::from(&args[1]),
        _ => return Err(eyre!("Expected at most one argument, the checkpoint path")),
    };

    // ---- RANDOM NUMBERS ----

    let seed = ga_params.seed.unwrap_or_else(rand::random);
    info!("Random seed: {}", seed);
    let mut rng = StdRng::seed_from_u64(seed);

    // ---- TERRAIN ----

    let terrain = match terrain_params.generate {
        Some(ref gen_params) => {
            let extent = terrain_params.extent()?;
            let mut gen_rng = StdRng::seed_from_u64(gen_params.seed.unwrap_or(seed));

            let obstacles = generate_obstacles(
                &mut gen_rng,
                gen_params,
                extent,
                &[ga_params.start(), ga_params.end()],
            );

            let obstacles_path = data_dir.join(&terrain_params.obstacles_file);
            save_obstacles(&obstacles_path, &obstacles)
                .wrap_err("Could not save the generated obstacles")?;
            info!(
                "Generated {} obstacles, saved to {:?}",
                obstacles.len(),
                obstacles_path
            );

            let danger = DangerMap::from_obstacles(
                &obstacles,
                extent,
                terrain_params.cell_size,
                terrain_params.influence_distance,
            )?;

            if let Some(ref f) = terrain_params.danger_map_file {
                let danger_path = data_dir.join(f);
                danger
                    .save(&danger_path)
                    .wrap_err("Could not save the generated danger map")?;
                info!("Danger map saved to {:?}", danger_path);
            }

            Terrain::new(extent, obstacles, danger)
        }
        None => Terrain::load(&terrain_params, &data_dir).wrap_err("Could not load the terrain")?,
    };

    // ---- OPTIMIZER INIT ----

    let checkpoint =
        CheckpointWriter::open(&checkpoint_path).wrap_err("Could not open the checkpoint")?;
    info!("Checkpointing to {:?}", checkpoint_path);

    let cancel = Arc::new(AtomicBool::new(false));
    spawn_stop_listener(cancel.clone());

    let mut runner = GaRunner::new(ga_params)
        .wrap_err("Failed to initialise the optimizer")?
        .with_cancel(cancel)
        .with_checkpoint(checkpoint);

    let mut stats_arch =
        Archiver::from_path(&session, "ga_stats.csv").wrap_err("Could not create the archive")?;

    // ---- MAIN LOOP ----

    info!("Starting optimizer, press enter to stop early\n");

    let report = runner
        .run(&terrain, &mut rng, |stats| {
            if stats.generation % 100 == 0 {
                info!(
                    "Generation {}: best {:.6}, mean {:.6}, population {}",
                    stats.generation, stats.best_fitness, stats.mean_fitness, stats.population
                );
            }

            if let Err(e) = stats_arch.serialise(stats) {
                warn!("Could not archive generation stats: {}", e);
            }
        })
        .wrap_err("The optimizer failed")?;

    info!(
        "Best fitness {:.6} (generation {}), {} genes",
        report.best_fitness,
        report.best_generation,
        report.best.len()
    );

    session
        .save("ga_report.json", &report)
        .wrap_err("Could not save the report")?;

    Ok(())
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Set the flag when a line is read from stdin.
///
/// An empty or closed stdin never sets the flag.
fn spawn_stop_listener(flag: Arc<AtomicBool>) {
    thread::spawn(move || {
        let mut line = String::new();
        if let Ok(n) = io::stdin().read_line(&mut line) {
            if n > 0 {
                info!("Stop requested");
                flag.store(true, Ordering::Relaxed);
            }
        }
    });
}
