//! # Tracking Simulation
//!
//! Drives a simulated vehicle along the best curve from a checkpoint, by
//! default `$BEZIER_NAV_ROOT/data/best_chromosome.txt` or the path given as
//! the only argument. The vehicle starts at the start of the curve and the
//! simulation ends when it reaches the goal or runs out of ticks.
//!
//! Each tick is archived to `track.csv` in the session archive directory.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{
    env,
    path::PathBuf,
    thread,
    time::Instant,
};

use color_eyre::{
    eyre::{eyre, WrapErr},
    Result,
};
use log::{debug, info, warn};
use serde::Serialize;

use nav_lib::{
    ga::checkpoint,
    traj_ctrl::{PidController, StatusReport, TrajCtrl, TrajCtrlParams, VehicleState},
};
use util::{
    archive::Archiver,
    host,
    logger::{logger_init, LevelFilter},
    session::Session,
    time::rate_to_period,
};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Checkpoint file name inside the data directory
const DEFAULT_CHECKPOINT: &str = "best_chromosome.txt";

// ------------------------------------------------------------------------------------------------
// DATA STRUCTURES
// ------------------------------------------------------------------------------------------------

/// One row of the tracking archive
#[derive(Serialize)]
struct TickRecord {
    tick: usize,
    sim_time_s: f64,
    x: f64,
    y: f64,
    heading_rad: f64,
    omega_rad: f64,
    lat_error: f64,
    distance: f64,
    closest_x: f64,
    closest_y: f64,
    curve_t: f64,
    omega_limited: bool,
    held: bool,
}

// ------------------------------------------------------------------------------------------------
// MAIN
// ------------------------------------------------------------------------------------------------

fn main() -> Result<()> {
    color_eyre::install()?;

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session =
        Session::new("track_sim", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Debug, &session).wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Tracking Simulation\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let params: TrajCtrlParams =
        util::params::load("traj_ctrl.toml").wrap_err("Could not load TrajCtrl params")?;
    debug!("TrajCtrl params: {:#?}", params);

    let args: Vec<String> = env::args().collect();
    let checkpoint_path = match args.len() {
        1 => host::get_nav_sw_root()
            .wrap_err("Could not find the software root")?
            .join("data")
            .join(DEFAULT_CHECKPOINT),
        2 => PathBuf::from(&args[1]),
        _ => return Err(eyre!("Expected at most one argument, the checkpoint path")),
    };

    // ---- LOAD CURVE ----

    let best = checkpoint::load_best(&checkpoint_path)
        .wrap_err_with(|| format!("Could not load a curve from {:?}", checkpoint_path))?;
    info!(
        "Tracking the generation {} chromosome with {} genes",
        best.generation,
        best.chromosome.len()
    );

    let curve = best
        .chromosome
        .to_curve()
        .wrap_err("The checkpointed chromosome is not a valid curve")?;

    // ---- MODULE INIT ----

    let tick_period = rate_to_period(params.tick_rate_hz)
        .ok_or_else(|| eyre!("Invalid tick rate {}", params.tick_rate_hz))?;
    let tick_rate_hz = params.tick_rate_hz;
    let max_ticks = params.max_ticks;
    let real_time = params.real_time;

    let mut traj_ctrl =
        TrajCtrl::new(params, curve).wrap_err("Failed to initialise TrajCtrl")?;
    let mut pid = PidController::from_params(traj_ctrl.params());
    let mut state = traj_ctrl.initial_state();

    let mut arch = Archiver::from_path(&session, "track.csv")
        .wrap_err("Could not create the tracking archive")?;

    // ---- MAIN LOOP ----

    info!("Beginning main loop\n");

    let mut num_held = 0;
    let mut goal_tick = None;

    for tick in 0..max_ticks {
        let tick_start = Instant::now();

        if traj_ctrl.goal_reached(&state) {
            goal_tick = Some(tick);
            break;
        }

        let output = match traj_ctrl.proc(&state, &mut pid) {
            Ok(o) => o,
            Err(e) => {
                warn!("TrajCtrl error on tick {}, holding: {}", tick, e);
                num_held += 1;
                traj_ctrl.hold(&state)
            }
        };

        arch.serialise(record(tick, tick_rate_hz, &output.state, output.omega, &output.report))
            .wrap_err("Could not archive the tick")?;

        state = output.state;

        // ---- CYCLE MANAGEMENT ----

        if real_time {
            let tick_dur = tick_start.elapsed();
            match tick_period.checked_sub(tick_dur) {
                Some(d) => thread::sleep(d),
                None => warn!(
                    "Tick overran by {:.06} s",
                    (tick_dur - tick_period).as_secs_f64()
                ),
            }
        }
    }

    match goal_tick {
        Some(t) => info!(
            "Goal reached after {} ticks ({:.2} s), {} held",
            t,
            t as f64 / tick_rate_hz,
            num_held
        ),
        None => warn!(
            "Goal not reached within {} ticks, finished at ({:.1}, {:.1})",
            max_ticks, state.position[0], state.position[1]
        ),
    }

    Ok(())
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn record(
    tick: usize,
    tick_rate_hz: f64,
    state: &VehicleState,
    omega: f64,
    report: &StatusReport,
) -> TickRecord {
    TickRecord {
        tick,
        sim_time_s: (tick + 1) as f64 / tick_rate_hz,
        x: state.position[0],
        y: state.position[1],
        heading_rad: state.heading_rad,
        omega_rad: omega,
        lat_error: report.lat_error,
        distance: report.distance,
        closest_x: report.closest_x,
        closest_y: report.closest_y,
        curve_t: report.curve_t,
        omega_limited: report.omega_limited,
        held: report.held,
    }
}
