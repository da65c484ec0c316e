//! Uniform resampling of paths

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use crate::geom::{Path, PathPoint};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Points closer than this to their predecessor are duplicates.
const DUPLICATE_DISTANCE_M: f64 = 1e-6;

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Resample the path with points every `spacing_m` along it.
///
/// The first and last points are kept exactly. A trailing remainder shorter than half the
/// spacing is merged into the previous interval, so every interval is within half a spacing of
/// `spacing_m`. A path shorter than the spacing only keeps its ends.
///
/// Paths with less than two points and non-positive spacings are returned unchanged.
pub fn resample(path: &Path, spacing_m: f64) -> Path {
    if path.len() < 2 || !(spacing_m > 0.0) {
        return path.clone();
    }

    // Drop consecutive duplicates, interpolation needs non-degenerate segments
    let mut points: Vec<PathPoint> = Vec::with_capacity(path.len());
    for p in path.points.iter() {
        match points.last() {
            Some(last) if (p.position2() - last.position2()).norm() < DUPLICATE_DISTANCE_M => (),
            _ => points.push(*p),
        }
    }

    let source = Path::from_points(points);
    if source.len() < 2 {
        return source;
    }

    let length_m = source.length();
    let num_full = (length_m / spacing_m).floor() as usize;
    let remainder_m = length_m - num_full as f64 * spacing_m;

    // Number of grid points strictly between the ends
    let num_inner = if num_full == 0 {
        0
    } else if remainder_m < 0.5 * spacing_m {
        num_full - 1
    } else {
        num_full
    };

    let mut resampled = Vec::with_capacity(num_inner + 2);
    resampled.push(source.points[0]);

    for i in 1..=num_inner {
        if let Some(p) = source.point_at_station(i as f64 * spacing_m) {
            resampled.push(p);
        }
    }

    if let Some(last) = source.points.last() {
        resampled.push(*last);
    }

    Path::from_points(resampled)
}
