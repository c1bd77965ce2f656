//! # Trajectory controllers module
//!
//! This module provides the PID controller used by TrajCtrl. The controller
//! runs at a fixed tick rate, so unlike a wall clock driven controller it is
//! given the rate rather than measuring the time between calls.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Serialize;

// Internal
use super::TrajCtrlParams;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A PID controller
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct PidController {
    /// Proportional gain
    k_p: f64,

    /// Integral gain
    k_i: f64,

    /// Derivative gain
    k_d: f64,

    /// Previous error, zero before the first tick
    prev_error: f64,

    /// The integral accumulation, already scaled by the integral gain
    integral: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PidController {
    /// Create a new controller with the given gains.
    pub fn new(k_p: f64, k_i: f64, k_d: f64) -> Self {
        Self {
            k_p,
            k_i,
            k_d,
            prev_error: 0.0,
            integral: 0.0,
        }
    }

    /// Create a new controller with the gains from the parameters.
    pub fn from_params(params: &TrajCtrlParams) -> Self {
        Self::new(params.k_p, params.k_i, params.k_d)
    }

    /// Get the value of the controller for the given error.
    ///
    /// The integral is accumulated with the trapezoidal rule and the
    /// derivative is the difference from the previous error times the tick
    /// rate.
    pub fn get(&mut self, error: f64, tick_rate_hz: f64) -> f64 {
        let prop = self.k_p * error;

        self.integral += self.k_i * (error + self.prev_error) / 2.0;

        let deriv = self.k_d * (error - self.prev_error) * tick_rate_hz;

        self.prev_error = error;

        prop + self.integral + deriv
    }

    /// Clear the integral and previous error.
    pub fn reset(&mut self) {
        self.prev_error = 0.0;
        self.integral = 0.0;
    }

    pub fn prev_error(&self) -> f64 {
        self.prev_error
    }

    pub fn integral(&self) -> f64 {
        self.integral
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_zero_error() {
        let mut pid = PidController::new(1.0, 1.0, 1.0);
        assert_eq!(pid.get(0.0, 60.0), 0.0);
        assert_eq!(pid.integral(), 0.0);
    }

    #[test]
    fn test_terms() {
        let mut pid = PidController::new(2.0, 0.5, 0.1);

        // P = 2 * 4, I = 0.5 * (4 + 0) / 2, D = 0.1 * 4 * 10
        assert_eq!(pid.get(4.0, 10.0), 8.0 + 1.0 + 4.0);
        assert_eq!(pid.prev_error(), 4.0);

        // P = 2 * 2, I = 1 + 0.5 * (2 + 4) / 2, D = 0.1 * (2 - 4) * 10
        let out = pid.get(2.0, 10.0);
        assert!((out - (4.0 + 2.5 - 2.0)).abs() < 1e-12);

        pid.reset();
        assert_eq!(pid, PidController::new(2.0, 0.5, 0.1));
    }
}
