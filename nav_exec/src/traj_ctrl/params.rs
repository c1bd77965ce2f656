//! Trajectory control parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Deserialize;

// Internal
use super::TrajCtrlError;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for trajectory control
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct TrajCtrlParams {
    /// Lateral controller proportional gain
    pub k_p: f64,

    /// Lateral controller integral gain
    pub k_i: f64,

    /// Lateral controller derivative gain
    pub k_d: f64,

    /// Constant vehicle speed in map units per second
    pub speed: f64,

    /// Rate at which the controller is run
    pub tick_rate_hz: f64,

    /// Limit on the magnitude of the turn demand per tick
    pub max_omega_rad: f64,

    /// Coarse resolution used when projecting onto the curve
    pub projection_resolution: usize,

    /// Distance from the end of the curve at which the goal is reached
    pub goal_tolerance: f64,

    /// Number of ticks after which a simulation gives up on the goal
    pub max_ticks: usize,

    /// If true simulations are paced to the tick rate in wall clock time
    pub real_time: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for TrajCtrlParams {
    fn default() -> Self {
        Self {
            k_p: 0.0055,
            k_i: 0.0000015,
            k_d: 0.000035,
            speed: 100.0,
            tick_rate_hz: 60.0,
            max_omega_rad: std::f64::consts::FRAC_PI_2,
            projection_resolution: 100,
            goal_tolerance: 5.0,
            max_ticks: 10_000,
            real_time: false,
        }
    }
}

impl TrajCtrlParams {
    /// Distance travelled in one tick
    pub fn step_length(&self) -> f64 {
        self.speed / self.tick_rate_hz
    }

    pub fn validate(&self) -> Result<(), TrajCtrlError> {
        if !(self.tick_rate_hz.is_finite() && self.tick_rate_hz > 0.0) {
            return Err(TrajCtrlError::InvalidParams(format!(
                "tick_rate_hz must be positive, found {}",
                self.tick_rate_hz
            )));
        }

        if !(self.speed.is_finite() && self.speed >= 0.0) {
            return Err(TrajCtrlError::InvalidParams(format!(
                "speed must be non-negative, found {}",
                self.speed
            )));
        }

        if !(self.max_omega_rad > 0.0) {
            return Err(TrajCtrlError::InvalidParams(format!(
                "max_omega_rad must be positive, found {}",
                self.max_omega_rad
            )));
        }

        if [self.k_p, self.k_i, self.k_d, self.goal_tolerance]
            .iter()
            .any(|v| !v.is_finite())
        {
            return Err(TrajCtrlError::InvalidParams(
                "gains and goal_tolerance must be finite".into(),
            ));
        }

        Ok(())
    }
}
