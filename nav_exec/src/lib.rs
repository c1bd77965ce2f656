//! # Navigation library.
//!
//! Plans a path across a field of circular obstacles and drives a simulated
//! vehicle along it. Planning evolves the control points of a Bezier curve
//! with a genetic optimizer scored against a danger map. Tracking steers a
//! constant speed vehicle onto the resulting curve with a PID controller on
//! the lateral error.
//!
//! The two phases are joined by a checkpoint file: the optimizer writes its
//! best chromosomes to it and the tracker is seeded from the last one.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Genetic optimizer - evolves candidate paths
pub mod ga;

/// Curve geometry - Bezier evaluation, length and projection
pub mod geom;

/// Map - obstacles and the danger field
pub mod map;

/// Trajectory control module - keeps the vehicle on the planned curve
pub mod traj_ctrl;
