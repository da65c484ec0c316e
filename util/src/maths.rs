//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

/// Map a value from one range into another.
///
/// The source range must not be empty, otherwise the result is not finite.
pub fn lin_map<T>(source_range: (T, T), target_range: (T, T), value: T) -> T
where
    T: Float,
{
    target_range.0
        + ((value - source_range.0) * (target_range.1 - target_range.0)
            / (source_range.1 - source_range.0))
}

/// Clamp `value` into `[min, max]`.
pub fn clamp<T>(value: T, min: T, max: T) -> T
where
    T: Float,
{
    value.max(min).min(max)
}

/// Normalised position of `value` within `[min, max]`, clamped to `[0, 1]`.
///
/// A degenerate range (`max <= min`) gives 0.
pub fn unit_ratio<T>(value: T, min: T, max: T) -> T
where
    T: Float,
{
    if max <= min {
        return T::zero();
    }

    clamp((value - min) / (max - min), T::zero(), T::one())
}

/// Calculates the least nonnegative remainder of `lhs (mod rhs)`.
///
/// Due to floating point round-off the result may equal `rhs.abs()` when `lhs` is a tiny
/// negative number.
pub fn rem_euclid<T>(lhs: T, rhs: T) -> T
where
    T: Float,
{
    let r = lhs % rhs;
    if r < T::zero() {
        r + rhs.abs()
    } else {
        r
    }
}

/// Wrap an angle into the range `[-pi, pi)`.
pub fn wrap_pi<T>(angle: T) -> T
where
    T: Float,
{
    let pi = T::from(std::f64::consts::PI).unwrap_or_else(T::zero);
    let tau = pi + pi;

    rem_euclid(angle + pi, tau) - pi
}

/// Signed shortest angular distance to go from `from` to `to`.
pub fn ang_diff<T>(from: T, to: T) -> T
where
    T: Float,
{
    wrap_pi(to - from)
}

/// Unwrap `angle` so that it is the representative closest to `previous`.
///
/// Applied along a sequence of headings this removes the 2pi jumps, giving a continuous signal.
pub fn unwrap_angle<T>(previous: T, angle: T) -> T
where
    T: Float,
{
    previous + ang_diff(previous, angle)
}
