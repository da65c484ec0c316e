//! Forward window extraction
//!
//! Each tick the evaluator only looks at the part of each reference path ahead of the vehicle.
//! The search for the vehicle's position on the path is incremental: it starts from a hint
//! returned by the previous extraction, so the cost of a tick does not grow with the path
//! length.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::Vector2;
use serde::Serialize;

use crate::{geom::Path, params::PreprocParams};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The window of a reference path ahead of the vehicle.
#[derive(Clone, Debug, Default, Serialize)]
pub struct Horizon {
    /// Points sampled ahead of the vehicle, starting at its projection on the path. Empty when
    /// off path.
    pub path: Path,

    /// Index at which the next extraction should start its search
    pub hint: usize,

    /// True if the vehicle is too far from the path for the window to be meaningful
    pub off_path: bool,

    /// Signed lateral offset of the vehicle from the path, positive to the left
    pub lateral_offset_m: f64,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Extract the window of `path` ahead of the vehicle at `position_m`.
///
/// The vehicle is projected onto the closest segment found by searching forward from `hint`.
/// The window is then sampled every `density_m` from the projected station until the sampled
/// distance reaches `horizon_distance_m`, or the path ends (the final point of the path is then
/// the last sample). Growing `horizon_distance_m` for the same position only appends samples.
pub fn extract_horizon(
    path: &Path,
    position_m: &Vector2<f64>,
    horizon_distance_m: f64,
    density_m: f64,
    hint: usize,
    params: &PreprocParams,
) -> Horizon {
    let proj = match path.project_until(position_m, hint, params.scan_exit_margin_m) {
        Some(p) => p,
        None => {
            return Horizon {
                off_path: true,
                ..Default::default()
            }
        }
    };

    let next_hint = proj.index.saturating_sub(1);

    // Beyond the ends the longitudinal part is bounded separately, elsewhere the closest point
    // may be a vertex and the perpendicular offset from the segment's line understates the gap
    let lateral_offset_m = if proj.overshoot_m > 0.0 {
        proj.lateral_m
    } else if proj.lateral_m < 0.0 {
        -proj.distance_m
    } else {
        proj.distance_m
    };

    if lateral_offset_m.abs() > params.off_path_lateral_tolerance_m
        || proj.overshoot_m > params.off_path_longitudinal_tolerance_m
    {
        return Horizon {
            path: Path::new_empty(),
            hint: next_hint,
            off_path: true,
            lateral_offset_m,
        };
    }

    let mut points = Vec::new();

    if let Some(start) = path.point_at_station(proj.station_m) {
        points.push(start);
    }

    let end_station_m = path.points.last().map(|p| p.station_m).unwrap_or(0.0);

    if density_m > 0.0 {
        let mut k = 1usize;
        loop {
            let distance_m = k as f64 * density_m;
            let station_m = proj.station_m + distance_m;

            if station_m >= end_station_m {
                if end_station_m > proj.station_m {
                    if let Some(end) = path.points.last() {
                        points.push(*end);
                    }
                }
                break;
            }

            if let Some(p) = path.point_at_station(station_m) {
                points.push(p);
            }

            if distance_m >= horizon_distance_m {
                break;
            }

            k += 1;
        }
    }

    Horizon {
        path: Path::from_points(points),
        hint: next_hint,
        off_path: false,
        lateral_offset_m,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn straight(length_m: f64) -> Path {
        let n = (length_m as usize) + 1;
        Path::from_xy(
            &(0..n)
                .map(|i| (i as f64, 0.0))
                .collect::<Vec<(f64, f64)>>(),
        )
    }

    #[test]
    fn test_window_extraction() {
        let path = straight(100.0);
        let params = PreprocParams::default();

        let h = extract_horizon(&path, &Vector2::new(10.3, 0.5), 5.0, 0.5, 0, &params);

        assert!(!h.off_path);
        assert_eq!(h.hint, 9);
        assert_eq!(h.lateral_offset_m, 0.5);
        assert_eq!(h.path.len(), 11);
        assert!((h.path.points[0].position_m.x - 10.3).abs() < 1e-9);
        assert!((h.path.points[10].position_m.x - 15.3).abs() < 1e-9);
        assert_eq!(h.path.points[0].station_m, 0.0);

        // Near the end of the path the window stops at the last point
        let h = extract_horizon(&path, &Vector2::new(98.2, 0.0), 5.0, 0.5, h.hint, &params);
        assert!(!h.off_path);
        assert_eq!(h.path.points.last().unwrap().position_m.x, 100.0);
    }

    #[test]
    fn test_horizon_monotonic() {
        let path = straight(60.0);
        let params = PreprocParams::default();
        let pos = Vector2::new(7.7, -0.2);

        let mut prev: Option<Path> = None;
        for &horizon in [0.0, 1.0, 3.3, 10.0, 25.0, 52.0, 80.0].iter() {
            let h = extract_horizon(&path, &pos, horizon, 0.5, 0, &params);

            if let Some(p) = prev {
                assert!(h.path.len() >= p.len());
                assert_eq!(&h.path.points[..p.len()], &p.points[..]);
            }
            prev = Some(h.path);
        }
    }

    #[test]
    fn test_off_path() {
        let path = straight(20.0);
        let params = PreprocParams::default();

        let h = extract_horizon(&path, &Vector2::new(5.0, 9.0), 5.0, 0.5, 0, &params);
        assert!(h.off_path);
        assert!(h.path.is_empty());

        let h = extract_horizon(&path, &Vector2::new(-4.0, 0.0), 5.0, 0.5, 0, &params);
        assert!(h.off_path);

        let h = extract_horizon(&path, &Vector2::new(21.0, 0.0), 5.0, 0.5, 0, &params);
        assert!(!h.off_path);
        assert_eq!(h.path.len(), 1);

        let h = extract_horizon(&Path::new_empty(), &Vector2::new(0.0, 0.0), 5.0, 0.5, 0, &params);
        assert!(h.off_path);
    }

    #[test]
    fn test_off_path_at_corner() {
        let path = Path::from_xy(&[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0)]);
        let params = PreprocParams::default();

        // Closest point is the corner, 10 m away, on the line of the first segment
        let h = extract_horizon(&path, &Vector2::new(20.0, 0.0), 5.0, 0.5, 0, &params);
        assert!(h.off_path);
        assert!(h.path.is_empty());
        assert_eq!(h.lateral_offset_m.abs(), 10.0);

        // Just outside the corner
        let h = extract_horizon(&path, &Vector2::new(10.6, -0.8), 5.0, 0.5, 0, &params);
        assert!(!h.off_path);
        assert!((h.lateral_offset_m.abs() - 1.0).abs() < 1e-9);
        assert_eq!(h.path.points[0].position_m.x, 10.0);
        assert_eq!(h.path.points[0].position_m.y, 0.0);
        assert_eq!(h.path.len(), 11);
    }
}
