//! # Curve geometry module
//!
//! Geometry shared by the planner and the trajectory controller. Points live
//! on the plane of the terrain map, with the same units as the obstacle and
//! danger map files.
//!
//! The main item is the [`BezierCurve`], built from the control points of a
//! chromosome. Both the validation step of the genetic optimizer and the
//! trajectory controller rely on [`BezierCurve::project`] to find how far a
//! point is from the curve.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod bezier;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::Vector2;

pub use bezier::*;

// ---------------------------------------------------------------------------
// TYPES
// ---------------------------------------------------------------------------

/// A point (or free vector) on the map plane.
pub type Point2D = Vector2<f64>;

/// A point used as a control point of a curve, or as a gene of a chromosome.
pub type ControlPoint = Point2D;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors raised by the geometry functions.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GeomError {
    /// The curve cannot be built: there are too few control points or all of
    /// them are coincident.
    #[error("Degenerate curve: {0}")]
    DegenerateCurve(String),

    /// A NaN or infinite point was given to a geometry function.
    #[error("Non-finite point ({0}, {1})")]
    NonFinitePoint(f64, f64),
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// The z component of the cross product of two vectors extended into 3D.
///
/// Positive if `b` points to the left of `a` (right hand rule about Z).
pub fn cross2(a: &Vector2<f64>, b: &Vector2<f64>) -> f64 {
    a[0] * b[1] - a[1] * b[0]
}

/// Which side of the direction of travel a target lies on.
///
/// Returns `1.0` if `to_target` points to the left of `heading`, `-1.0` if to
/// the right, and `0.0` if the two are parallel.
pub fn lateral_sign(heading: &Vector2<f64>, to_target: &Vector2<f64>) -> f64 {
    let cross = cross2(heading, to_target);

    // f64::signum gives 1 for +0.0, which would pick a side for collinear
    // targets
    if cross == 0.0 {
        0.0
    }
    else {
        cross.signum()
    }
}

/// Unit vector pointing along the given heading (angle to the +ve X axis).
pub fn heading_vector(heading_rad: f64) -> Vector2<f64> {
    Vector2::new(heading_rad.cos(), heading_rad.sin())
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
