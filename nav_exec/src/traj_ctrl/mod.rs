//! # Trajectory control module
//!
//! Trajectory control steers a constant speed vehicle along the Bezier curve
//! found by the optimizer. Each tick it predicts where the vehicle will be
//! after one more step, projects that prediction onto the curve, and turns the
//! offset into a signed lateral error:
//!
//! ```text
//! y_err = cross(heading, p - z) * |p - z|
//! ```
//!
//! where `z` is the predicted position and `p` the closest point on the curve.
//! The error is positive when the curve lies to the left of the vehicle. A
//! [`PidController`] turns the error into a turn demand `omega`, which is
//! saturated and then added to the vehicle's heading before the vehicle is
//! moved forwards.
//!
//! The controller state is owned by the caller and passed into each tick, so
//! several vehicles can be simulated against one [`TrajCtrl`].

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod controllers;
pub mod params;
pub mod state;
pub mod vehicle;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

pub use controllers::*;
pub use params::TrajCtrlParams;
pub use state::*;
pub use vehicle::*;

use crate::geom::GeomError;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum TrajCtrlError {
    #[error("Invalid trajectory control parameters: {0}")]
    InvalidParams(String),

    /// The curve can't be tracked or projected onto.
    #[error("Geometry error: {0}")]
    Geom(#[from] GeomError),
}
