//! Kinematic vehicle model

use serde::Serialize;

use crate::geom::{heading_vector, Point2D};
use util::maths::wrap_pi;

/// Position and heading of a constant speed point vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VehicleState {
    pub position: Point2D,

    /// Angle to the +ve X axis, in `(-pi, pi]`
    pub heading_rad: f64,
}

impl VehicleState {
    pub fn new(position: Point2D, heading_rad: f64) -> Self {
        Self {
            position,
            heading_rad: wrap_pi(heading_rad),
        }
    }

    /// Unit vector along the heading
    pub fn heading(&self) -> Point2D {
        heading_vector(self.heading_rad)
    }

    /// Where the vehicle will be after moving `step` along its current
    /// heading.
    pub fn predict(&self, step: f64) -> Point2D {
        self.position + self.heading() * step
    }

    /// Turn by `omega` then move `step` along the new heading.
    pub fn advance(&self, omega: f64, step: f64) -> Self {
        let turned = Self::new(self.position, self.heading_rad + omega);
        Self {
            position: turned.predict(step),
            heading_rad: turned.heading_rad,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, PI};

    #[test]
    fn test_advance() {
        let v = VehicleState::new(Point2D::new(1.0, 1.0), 0.0);

        let straight = v.advance(0.0, 2.0);
        assert_eq!(straight.position, Point2D::new(3.0, 1.0));
        assert_eq!(straight.heading_rad, 0.0);

        let left = v.advance(FRAC_PI_2, 2.0);
        assert!((left.position - Point2D::new(1.0, 3.0)).norm() < 1e-12);
        assert!((left.heading_rad - FRAC_PI_2).abs() < 1e-12);
    }

    #[test]
    fn test_heading_wraps() {
        let v = VehicleState::new(Point2D::zeros(), 3.0).advance(1.0, 0.0);
        assert!((v.heading_rad - (4.0 - 2.0 * PI)).abs() < 1e-12);
    }
}
