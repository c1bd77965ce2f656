//! Numeric helpers shared by the planner and tracker

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::{Euclid, Float, FloatConst};

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Linearly interpolate `value` from the `from` interval onto the `to`
/// interval.
///
/// Values outside `from` are extrapolated. Reversed intervals are allowed, so
/// `lin_map((0.0, d), (1.0, 0.0), x)` falls from 1 to 0 as `x` goes to `d`.
pub fn lin_map<T: Float>(from: (T, T), to: (T, T), value: T) -> T {
    let frac = (value - from.0) / (from.1 - from.0);
    to.0 + frac * (to.1 - to.0)
}

/// Wrap an angle in radians into (-pi, pi].
pub fn wrap_pi<T>(angle: T) -> T
where
    T: Float + FloatConst + Euclid,
{
    let wrapped = Euclid::rem_euclid(&(angle + T::PI()), &T::TAU()) - T::PI();

    // The remainder lands in [-pi, pi), so -pi belongs at the top
    if wrapped <= -T::PI() {
        wrapped + T::TAU()
    }
    else {
        wrapped
    }
}
