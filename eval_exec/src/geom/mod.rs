//! # Geometry primitives
//!
//! Paths, path points and polygons shared by every stage of the evaluator. All geometry is done
//! on the ground plane, the `z` coordinate of path points is carried along but never used in
//! distances.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod path;
mod polygon;

// ------------------------------------------------------------------------------------------------
// EXPORTS
// ------------------------------------------------------------------------------------------------

pub use path::{Path, PathPoint, Projection};
pub use polygon::Polygon;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use nalgebra::Vector2;

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Closest point to `p` on the segment `a -> b`, along with the segment ratio of that point.
///
/// The ratio is not clamped, values outside `[0, 1]` mean `p` projects beyond the segment ends.
/// The returned point is always on the segment.
pub fn project_on_segment(
    p: &Vector2<f64>,
    a: &Vector2<f64>,
    b: &Vector2<f64>,
) -> (Vector2<f64>, f64) {
    let ab = b - a;
    let len_sq = ab.norm_squared();

    if len_sq <= std::f64::EPSILON {
        return (*a, 0.0);
    }

    let ratio = (p - a).dot(&ab) / len_sq;
    let closest = a + ab * ratio.max(0.0).min(1.0);

    (closest, ratio)
}

/// Distance between `p` and the segment `a -> b`.
pub fn distance_to_segment(p: &Vector2<f64>, a: &Vector2<f64>, b: &Vector2<f64>) -> f64 {
    let (closest, _) = project_on_segment(p, a, b);
    (p - closest).norm()
}

/// 2D cross product (z component of the 3D one).
pub fn cross(a: &Vector2<f64>, b: &Vector2<f64>) -> f64 {
    a.x * b.y - a.y * b.x
}

/// Returns true if the segments `a0 -> a1` and `b0 -> b1` touch or cross.
pub fn segments_intersect(
    a0: &Vector2<f64>,
    a1: &Vector2<f64>,
    b0: &Vector2<f64>,
    b1: &Vector2<f64>,
) -> bool {
    let d0 = cross(&(a1 - a0), &(b0 - a0));
    let d1 = cross(&(a1 - a0), &(b1 - a0));
    let d2 = cross(&(b1 - b0), &(a0 - b0));
    let d3 = cross(&(b1 - b0), &(a1 - b0));

    if ((d0 > 0.0 && d1 < 0.0) || (d0 < 0.0 && d1 > 0.0))
        && ((d2 > 0.0 && d3 < 0.0) || (d2 < 0.0 && d3 > 0.0))
    {
        return true;
    }

    // Colinear or touching cases
    (d0 == 0.0 && on_segment(b0, a0, a1))
        || (d1 == 0.0 && on_segment(b1, a0, a1))
        || (d2 == 0.0 && on_segment(a0, b0, b1))
        || (d3 == 0.0 && on_segment(a1, b0, b1))
}

/// Assuming `p` is colinear with `a -> b`, is it inside the segment's bounding box.
fn on_segment(p: &Vector2<f64>, a: &Vector2<f64>, b: &Vector2<f64>) -> bool {
    p.x >= a.x.min(b.x) && p.x <= a.x.max(b.x) && p.y >= a.y.min(b.y) && p.y <= a.y.max(b.y)
}
