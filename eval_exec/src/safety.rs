//! # Safety envelope
//!
//! The envelope is the area the vehicle body sweeps along a path, inflated by safety margins.
//! Any obstacle overlapping it is treated as touching the vehicle.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use nalgebra::Vector2;

use crate::{
    geom::{Path, PathPoint, Polygon},
    params::CarParams,
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Footprint dimensions of the vehicle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VehicleDims {
    pub width_m: f64,
    pub length_m: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl From<&CarParams> for VehicleDims {
    fn from(car: &CarParams) -> Self {
        Self {
            width_m: car.width_m,
            length_m: car.length_m,
        }
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Build the safety envelope around the path.
///
/// The path is offset on both sides by half the vehicle width plus `lateral_margin_m`, and
/// extended by `longitudinal_margin_m` beyond both ends along the end tangents. A single point
/// gives a rectangle oriented along the point's heading, an empty path an empty polygon.
pub fn build(
    path: &Path,
    dims: &VehicleDims,
    longitudinal_margin_m: f64,
    lateral_margin_m: f64,
) -> Polygon {
    let half_width_m = 0.5 * dims.width_m + lateral_margin_m;

    // Centre line and the unit tangent at each of its points
    let mut centre: Vec<(Vector2<f64>, Vector2<f64>)> = Vec::with_capacity(path.len() + 2);

    match path.len() {
        0 => return Polygon::default(),
        1 => {
            let p = &path.points[0];
            let t = heading_vec(p);
            centre.push((p.position2() - t * longitudinal_margin_m, t));
            centre.push((p.position2() + t * longitudinal_margin_m, t));
        }
        n => {
            for i in 0..n {
                let t = path
                    .tangent_at(i)
                    .unwrap_or_else(|| heading_vec(&path.points[i]));
                centre.push((path.points[i].position2(), t));
            }

            if longitudinal_margin_m > 0.0 {
                let (start, t_start) = centre[0];
                let (end, t_end) = centre[n - 1];
                centre.insert(0, (start - t_start * longitudinal_margin_m, t_start));
                centre.push((end + t_end * longitudinal_margin_m, t_end));
            }
        }
    }

    let left = centre.iter().map(|(p, t)| p + left_normal(t) * half_width_m);
    let right = centre.iter().rev().map(|(p, t)| p - left_normal(t) * half_width_m);

    Polygon::new(left.chain(right).collect())
}

/// The part of the path covered by a vehicle of the given length starting at the first point.
///
/// Paths shorter than the length are returned whole.
pub fn ego_prefix(path: &Path, length_m: f64) -> Path {
    let mut points: Vec<PathPoint> = path
        .points
        .iter()
        .take_while(|p| p.station_m <= length_m)
        .copied()
        .collect();

    if points.len() < path.len() {
        if let Some(p) = path.point_at_station(length_m) {
            if points.last().map(|l| l.station_m < p.station_m).unwrap_or(true) {
                points.push(p);
            }
        }
    }

    Path { points }
}

fn heading_vec(p: &PathPoint) -> Vector2<f64> {
    Vector2::new(p.heading_rad.cos(), p.heading_rad.sin())
}

fn left_normal(t: &Vector2<f64>) -> Vector2<f64> {
    Vector2::new(-t.y, t.x)
}
