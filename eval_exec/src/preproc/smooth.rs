//! Iterative path smoothing

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::Vector2;

use crate::geom::Path;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Upper bound on the number of smoothing iterations.
pub const SMOOTH_MAX_ITERATIONS: usize = 1000;

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Smooth the path by local averaging.
///
/// Each interior point is pulled towards an anchor by `weight_data` and towards its neighbours
/// by `weight_smooth`. Points are updated in place, so each update sees the already updated
/// previous neighbour. The anchors start at the original positions. Once no point moves by
/// `tolerance_m` or more in one iteration, the anchors are moved to the settled points, and
/// smoothing stops when a step from the anchors could not move any point by `tolerance_m`.
/// The total number of iterations is capped at [`SMOOTH_MAX_ITERATIONS`].
///
/// A smoothed path is therefore left in place by smoothing it again with the same parameters.
///
/// The end points never move. Only the ground position is smoothed, stations are recomputed.
pub fn smooth(path: &Path, weight_data: f64, weight_smooth: f64, tolerance_m: f64) -> Path {
    let mut smoothed = path.clone();

    if path.len() <= 2 {
        return smoothed;
    }

    let mut current: Vec<Vector2<f64>> = path.points.iter().map(|p| p.position2()).collect();
    let mut anchors = current.clone();
    let mut settled = true;

    // A step from the anchors moves point i by at most weight_smooth times its own second
    // difference plus weight_smooth times the move of point i - 1.
    let step_bound_m = tolerance_m * (1.0 - weight_smooth);

    for _ in 0..SMOOTH_MAX_ITERATIONS {
        if settled {
            if max_second_difference(&current) * weight_smooth < step_bound_m {
                break;
            }
            anchors.copy_from_slice(&current);
        }

        let mut max_change_m = 0f64;

        for i in 1..current.len() - 1 {
            let prev = current[i];

            let delta = weight_data * (anchors[i] - prev)
                + weight_smooth * (current[i - 1] + current[i + 1] - 2.0 * prev);
            current[i] = prev + delta;

            max_change_m = max_change_m.max(delta.norm());
        }

        settled = max_change_m < tolerance_m;
    }

    for (point, pos) in smoothed.points.iter_mut().zip(current.iter()) {
        point.position_m.x = pos.x;
        point.position_m.y = pos.y;
    }
    smoothed.recompute_arc_length();

    smoothed
}

/// Largest norm of the discrete second difference over the interior points.
fn max_second_difference(points: &[Vector2<f64>]) -> f64 {
    points
        .windows(3)
        .map(|w| (w[0] + w[2] - 2.0 * w[1]).norm())
        .fold(0.0, f64::max)
}
