//! Trajectory control module state

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::trace;
use serde::Serialize;

// Internal
use super::*;
use crate::geom::{cross2, BezierCurve, GeomError};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Tracks a single Bezier curve.
#[derive(Debug, Clone)]
pub struct TrajCtrl {
    params: TrajCtrlParams,

    /// The curve being tracked
    curve: BezierCurve,

    /// Turn demand of the last successful tick, used when holding
    last_omega: f64,
}

/// Result of one tick of the controller.
#[derive(Debug, Clone, Copy)]
pub struct TickOutput {
    /// The vehicle state after the turn demand has been applied
    pub state: VehicleState,

    /// The applied turn demand
    pub omega: f64,

    pub report: StatusReport,
}

/// The status report containing monitoring quantities for one tick.
///
/// Fields are flat so the report can be archived directly as a CSV row.
#[derive(Debug, Default, Copy, Clone, Serialize)]
pub struct StatusReport {
    /// Signed lateral error, positive if the curve is to the left
    pub lat_error: f64,

    /// Distance from the predicted position to the curve
    pub distance: f64,

    /// Closest point on the curve to the predicted position
    pub closest_x: f64,
    pub closest_y: f64,

    /// Curve parameter of the closest point
    pub curve_t: f64,

    /// True if the turn demand was saturated
    pub omega_limited: bool,

    /// True if the previous turn demand was reused rather than computed
    pub held: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl TrajCtrl {
    /// Create a controller for the given curve.
    ///
    /// Curves without an interior control point are rejected with
    /// [`GeomError::DegenerateCurve`].
    pub fn new(params: TrajCtrlParams, curve: BezierCurve) -> Result<Self, TrajCtrlError> {
        params.validate()?;

        if curve.num_control_points() < 3 {
            return Err(GeomError::DegenerateCurve(format!(
                "a tracked curve needs at least 3 control points, found {}",
                curve.num_control_points()
            ))
            .into());
        }

        Ok(Self {
            params,
            curve,
            last_omega: 0.0,
        })
    }

    pub fn curve(&self) -> &BezierCurve {
        &self.curve
    }

    pub fn params(&self) -> &TrajCtrlParams {
        &self.params
    }

    /// A vehicle placed at the start of the curve, pointing towards the first
    /// control point that differs from the start.
    pub fn initial_state(&self) -> VehicleState {
        let start = self.curve.start();
        let heading_rad = self
            .curve
            .control_points()
            .iter()
            .map(|p| p - start)
            .find(|d| d.norm() > 0.0)
            .map_or(0.0, |d| d[1].atan2(d[0]));

        VehicleState::new(start, heading_rad)
    }

    /// Process one tick.
    ///
    /// On error the controller is left untouched and the caller should
    /// [`hold`](Self::hold) instead.
    pub fn proc(
        &mut self,
        state: &VehicleState,
        pid: &mut PidController,
    ) -> Result<TickOutput, TrajCtrlError> {
        let step = self.params.step_length();

        // Predict the next position and project it onto the curve
        let predicted = state.predict(step);
        let proj = self
            .curve
            .project_with_resolution(&predicted, self.params.projection_resolution)?;

        let lat_error = cross2(&state.heading(), &(proj.point - predicted)) * proj.distance;

        let demand = pid.get(lat_error, self.params.tick_rate_hz);
        let omega = demand.clamp(-self.params.max_omega_rad, self.params.max_omega_rad);

        trace!(
            "lat_error: {:.4}, demand: {:.4}, omega: {:.4}",
            lat_error,
            demand,
            omega
        );

        self.last_omega = omega;

        Ok(TickOutput {
            state: state.advance(omega, step),
            omega,
            report: StatusReport {
                lat_error,
                distance: proj.distance,
                closest_x: proj.point[0],
                closest_y: proj.point[1],
                curve_t: proj.t,
                omega_limited: omega != demand,
                held: false,
            },
        })
    }

    /// Advance the vehicle using the last valid turn demand.
    pub fn hold(&self, state: &VehicleState) -> TickOutput {
        TickOutput {
            state: state.advance(self.last_omega, self.params.step_length()),
            omega: self.last_omega,
            report: StatusReport {
                held: true,
                ..StatusReport::default()
            },
        }
    }

    /// Whether the vehicle is within `goal_tolerance` of the end of the
    /// curve.
    pub fn goal_reached(&self, state: &VehicleState) -> bool {
        (state.position - self.curve.end()).norm() <= self.params.goal_tolerance
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
