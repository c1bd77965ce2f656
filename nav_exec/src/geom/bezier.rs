//! # Bezier curve
//!
//! A Bezier curve of degree `n - 1` defined by `n` control points. The curve
//! passes through the first and last control points, the interior points pull
//! it towards them without (in general) lying on it.
//!
//! Evaluation uses de Casteljau's algorithm, which is numerically stable and
//! returns the end points exactly at `t = 0` and `t = 1`. Parameters outside
//! `[0, 1]` are not clamped, the curve polynomial is simply extrapolated. It
//! is up to callers to keep `t` in range if they don't want this.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use super::{GeomError, Point2D};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Number of chords used by default when estimating the curve length.
pub const DEFAULT_LENGTH_SAMPLES: usize = 100;

/// Number of coarse intervals sampled by default during projection.
pub const DEFAULT_PROJECTION_RESOLUTION: usize = 100;

/// Width of the parameter interval at which projection refinement stops.
const REFINE_TOLERANCE: f64 = 1e-10;

/// Upper bound on the number of refinement iterations.
const MAX_REFINE_ITERS: usize = 100;

/// Inverse of the golden ratio, used by the golden-section search.
const INV_PHI: f64 = 0.618_033_988_749_894_8;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A Bezier curve on the map plane.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BezierCurve {
    control_points: Vec<Point2D>,
}

/// The closest point on a curve to some query point.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Projection {
    /// The closest point on the curve
    pub point: Point2D,

    /// Euclidean distance between the query point and `point`
    pub distance: f64,

    /// Curve parameter of `point`
    pub t: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl BezierCurve {
    /// Build a new curve from the given control points.
    ///
    /// A curve needs at least two control points and they must not all be in
    /// the same place, otherwise `GeomError::DegenerateCurve` is returned.
    /// Non-finite control points are rejected with
    /// `GeomError::NonFinitePoint`.
    pub fn new(control_points: Vec<Point2D>) -> Result<Self, GeomError> {
        if control_points.len() < 2 {
            return Err(GeomError::DegenerateCurve(format!(
                "expected at least 2 control points, found {}",
                control_points.len()
            )));
        }

        if let Some(p) = control_points.iter().find(|p| !is_finite(p)) {
            return Err(GeomError::NonFinitePoint(p[0], p[1]));
        }

        let first = control_points[0];
        if control_points.iter().all(|p| *p == first) {
            return Err(GeomError::DegenerateCurve(format!(
                "all {} control points are coincident at ({}, {})",
                control_points.len(),
                first[0],
                first[1]
            )));
        }

        Ok(Self { control_points })
    }

    /// The control points of the curve.
    pub fn control_points(&self) -> &[Point2D] {
        &self.control_points
    }

    /// Number of control points, one more than the degree of the curve.
    pub fn num_control_points(&self) -> usize {
        self.control_points.len()
    }

    /// The first control point, where the curve starts.
    pub fn start(&self) -> Point2D {
        self.control_points[0]
    }

    /// The last control point, where the curve ends.
    pub fn end(&self) -> Point2D {
        self.control_points[self.control_points.len() - 1]
    }

    /// The same curve traversed backwards.
    pub fn reversed(&self) -> Self {
        let mut control_points = self.control_points.clone();
        control_points.reverse();
        Self { control_points }
    }

    /// Evaluate the curve at parameter `t`.
    ///
    /// `t` is not clamped, values outside `[0, 1]` extrapolate the curve.
    pub fn evaluate(&self, t: f64) -> Point2D {
        let mut points = self.control_points.clone();
        let one_minus_t = 1.0 - t;

        // Each pass blends neighbouring points, leaving one fewer point. The
        // (1 - t) p + t q form returns p exactly at t = 0 and q exactly at
        // t = 1.
        for level in (1..points.len()).rev() {
            for i in 0..level {
                points[i] = points[i] * one_minus_t + points[i + 1] * t;
            }
        }

        points[0]
    }

    /// Evaluate the curve at `num_intervals + 1` uniformly spaced parameters,
    /// from `t = 0` to `t = 1` inclusive.
    ///
    /// `num_intervals` is raised to at least 1.
    pub fn sample(&self, num_intervals: usize) -> Vec<Point2D> {
        let n = num_intervals.max(1);
        (0..=n)
            .map(|i| self.evaluate(i as f64 / n as f64))
            .collect()
    }

    /// Approximate the arc length as the sum of the chords between
    /// `samples + 1` uniformly spaced points on the curve.
    ///
    /// The approximation is always shorter than or equal to the true length,
    /// and only increases as the sampling is refined (e.g. doubled). It is
    /// meant for comparing candidate curves against each other.
    pub fn length(&self, samples: usize) -> f64 {
        self.sample(samples)
            .windows(2)
            .map(|w| (w[1] - w[0]).norm())
            .sum()
    }

    /// Find the closest point on the curve to `point` using the default
    /// coarse resolution.
    pub fn project(&self, point: &Point2D) -> Result<Projection, GeomError> {
        self.project_with_resolution(point, DEFAULT_PROJECTION_RESOLUTION)
    }

    /// Find the closest point on the curve to `point`.
    ///
    /// The curve is first sampled at `resolution + 1` parameters. The best
    /// sample brackets the minimum between its two neighbours, and the
    /// squared distance is then minimised over that bracket with a
    /// golden-section search. The refined point is only kept if it is closer
    /// than the best sample.
    pub fn project_with_resolution(
        &self,
        point: &Point2D,
        resolution: usize,
    ) -> Result<Projection, GeomError> {
        if !is_finite(point) {
            return Err(GeomError::NonFinitePoint(point[0], point[1]));
        }

        let n = resolution.max(1);
        let step = 1.0 / n as f64;

        // ---- COARSE SEARCH ----

        let mut best_index = 0;
        let mut best_dist_sq = f64::INFINITY;
        for i in 0..=n {
            let dist_sq = (self.evaluate(i as f64 / n as f64) - point).norm_squared();
            if dist_sq < best_dist_sq {
                best_dist_sq = dist_sq;
                best_index = i;
            }
        }

        let coarse_t = best_index as f64 / n as f64;

        // ---- REFINEMENT ----

        let lower = (coarse_t - step).max(0.0);
        let upper = (coarse_t + step).min(1.0);
        let fine_t = self.golden_section(point, lower, upper);
        let fine_dist_sq = (self.evaluate(fine_t) - point).norm_squared();

        let t = if fine_dist_sq < best_dist_sq {
            fine_t
        }
        else {
            coarse_t
        };

        let closest = self.evaluate(t);

        Ok(Projection {
            point: closest,
            distance: (closest - point).norm(),
            t,
        })
    }

    /// Minimise the squared distance to `point` over `[lower, upper]`.
    fn golden_section(&self, point: &Point2D, mut lower: f64, mut upper: f64) -> f64 {
        let dist_sq = |t: f64| (self.evaluate(t) - point).norm_squared();

        let mut c = upper - INV_PHI * (upper - lower);
        let mut d = lower + INV_PHI * (upper - lower);
        let mut fc = dist_sq(c);
        let mut fd = dist_sq(d);

        for _ in 0..MAX_REFINE_ITERS {
            if upper - lower < REFINE_TOLERANCE {
                break;
            }

            if fc < fd {
                upper = d;
                d = c;
                fd = fc;
                c = upper - INV_PHI * (upper - lower);
                fc = dist_sq(c);
            }
            else {
                lower = c;
                c = d;
                fc = fd;
                d = lower + INV_PHI * (upper - lower);
                fd = dist_sq(d);
            }
        }

        0.5 * (lower + upper)
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

fn is_finite(p: &Point2D) -> bool {
    p[0].is_finite() && p[1].is_finite()
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
