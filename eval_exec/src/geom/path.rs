//! # Path
//!
//! This module defines the path used by the evaluator, both for reference paths and for the
//! candidate rollouts.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use comms_if::lane::{LaneMsg, WaypointMsg};
use nalgebra::{Vector2, Vector3};
use serde::{Deserialize, Serialize};

// Internal
use super::{cross, project_on_segment};
use util::maths::ang_diff;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A single point along a path.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PathPoint {
    pub position_m: Vector3<f64>,

    /// Heading (angle to the +ve x axis) at this point
    pub heading_rad: f64,

    /// Target velocity at this point
    pub velocity_ms: f64,

    /// Arc length from the first point of the path
    pub station_m: f64,

    /// Id of the global path this point originates from
    pub gid: i64,

    /// Local cost of the point
    pub cost: f64,
}

/// An ordered sequence of points.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Path {
    pub points: Vec<PathPoint>,
}

/// Result of projecting a position onto a path.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Projection {
    /// Index of the start point of the matched segment
    pub index: usize,

    /// Ratio along the matched segment, unclamped, so outside `[0, 1]` when the position lies
    /// beyond the end of the segment.
    pub ratio: f64,

    /// Closest point on the path
    pub position_m: Vector2<f64>,

    /// Station of the closest point
    pub station_m: f64,

    /// Distance between the position and the closest point
    pub distance_m: f64,

    /// Signed perpendicular distance from the matched segment's line, positive to the left
    pub lateral_m: f64,

    /// How far the position lies beyond the first or last point along the end segments, zero
    /// when it projects within the path.
    pub overshoot_m: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PathPoint {
    /// Create a new point at the given ground position, all other fields zeroed.
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            position_m: Vector3::new(x, y, 0.0),
            heading_rad: 0.0,
            velocity_ms: 0.0,
            station_m: 0.0,
            gid: 0,
            cost: 0.0,
        }
    }

    /// Position of the point on the ground plane
    pub fn position2(&self) -> Vector2<f64> {
        Vector2::new(self.position_m.x, self.position_m.y)
    }

    /// Linearly interpolate between `self` (ratio 0) and `other` (ratio 1).
    ///
    /// The gid is always taken from `self`.
    pub fn lerp(&self, other: &Self, ratio: f64) -> Self {
        Self {
            position_m: self.position_m + (other.position_m - self.position_m) * ratio,
            heading_rad: self.heading_rad + ang_diff(self.heading_rad, other.heading_rad) * ratio,
            velocity_ms: self.velocity_ms + (other.velocity_ms - self.velocity_ms) * ratio,
            station_m: self.station_m + (other.station_m - self.station_m) * ratio,
            gid: self.gid,
            cost: self.cost + (other.cost - self.cost) * ratio,
        }
    }
}

impl From<&WaypointMsg> for PathPoint {
    fn from(msg: &WaypointMsg) -> Self {
        Self {
            position_m: Vector3::new(msg.position_m[0], msg.position_m[1], msg.position_m[2]),
            heading_rad: msg.yaw_rad,
            velocity_ms: msg.velocity_ms,
            station_m: 0.0,
            gid: msg.gid,
            cost: msg.cost,
        }
    }
}

impl From<&PathPoint> for WaypointMsg {
    fn from(point: &PathPoint) -> Self {
        Self {
            position_m: [point.position_m.x, point.position_m.y, point.position_m.z],
            yaw_rad: point.heading_rad,
            velocity_ms: point.velocity_ms,
            gid: point.gid,
            cost: point.cost,
        }
    }
}

impl Path {
    /// Create a new empty path
    pub fn new_empty() -> Self {
        Self { points: Vec::new() }
    }

    /// Create a path from the given points, recomputing their stations.
    pub fn from_points(points: Vec<PathPoint>) -> Self {
        let mut path = Self { points };
        path.recompute_arc_length();
        path
    }

    /// Create a path through the given ground positions.
    pub fn from_xy(positions: &[(f64, f64)]) -> Self {
        Self::from_points(
            positions
                .iter()
                .map(|&(x, y)| PathPoint::new(x, y))
                .collect(),
        )
    }

    /// Get the number of points in the path
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Id of the global path this path was generated from, taken from its first point.
    pub fn gid(&self) -> Option<i64> {
        self.points.first().map(|p| p.gid)
    }

    /// Set every station to the cumulative chord distance from the first point.
    pub fn recompute_arc_length(&mut self) {
        let mut station_m = 0.0;
        let mut prev: Option<Vector2<f64>> = None;

        for point in self.points.iter_mut() {
            let pos = point.position2();
            if let Some(p) = prev {
                station_m += (pos - p).norm();
            }
            point.station_m = station_m;
            prev = Some(pos);
        }
    }

    /// Return the length of the path in meters, zero for paths with less than two points.
    pub fn length(&self) -> f64 {
        self.points
            .windows(2)
            .map(|w| (w[1].position2() - w[0].position2()).norm())
            .sum()
    }

    /// Interpolate the path at the given station.
    ///
    /// Stations outside the path are clamped to its ends. Returns `None` for an empty path.
    pub fn point_at_station(&self, station_m: f64) -> Option<PathPoint> {
        let first = self.points.first()?;
        let last = self.points.last()?;

        if station_m <= first.station_m || self.points.len() == 1 {
            return Some(*first);
        }
        if station_m >= last.station_m {
            return Some(*last);
        }

        // Index of the first point strictly beyond the station, at least 1 from the checks above
        let end = self
            .points
            .partition_point(|p| p.station_m <= station_m)
            .max(1)
            .min(self.points.len() - 1);
        let start = &self.points[end - 1];
        let target = &self.points[end];

        let seg_len = target.station_m - start.station_m;
        let ratio = if seg_len > 0.0 {
            (station_m - start.station_m) / seg_len
        } else {
            0.0
        };

        let mut point = start.lerp(target, ratio);
        point.station_m = station_m;
        Some(point)
    }

    /// Returns true if both paths have the same number of points and every pair of points is
    /// within `tolerance_m` of each other.
    pub fn approx_eq(&self, other: &Self, tolerance_m: f64) -> bool {
        self.points.len() == other.points.len()
            && self
                .points
                .iter()
                .zip(other.points.iter())
                .all(|(a, b)| (a.position2() - b.position2()).norm() <= tolerance_m)
    }

    /// Project the position onto the path, searching forwards from the segment starting at
    /// `from_index`.
    pub fn project(&self, position_m: &Vector2<f64>, from_index: usize) -> Option<Projection> {
        self.project_until(position_m, from_index, std::f64::INFINITY)
    }

    /// Project the position onto the path, searching forwards from the segment starting at
    /// `from_index`.
    ///
    /// The search stops once the distance to the current segment is larger than the best match
    /// so far by more than `exit_margin_m`.
    pub fn project_until(
        &self,
        position_m: &Vector2<f64>,
        from_index: usize,
        exit_margin_m: f64,
    ) -> Option<Projection> {
        match self.points.len() {
            0 => return None,
            1 => {
                let p = &self.points[0];
                let distance_m = (position_m - p.position2()).norm();
                return Some(Projection {
                    index: 0,
                    ratio: 0.0,
                    position_m: p.position2(),
                    station_m: p.station_m,
                    distance_m,
                    lateral_m: distance_m,
                    overshoot_m: 0.0,
                });
            }
            _ => (),
        }

        let num_segs = self.points.len() - 1;
        let mut best: Option<(usize, Vector2<f64>, f64, f64)> = None;

        for i in from_index.min(num_segs - 1)..num_segs {
            let a = self.points[i].position2();
            let b = self.points[i + 1].position2();
            let (closest, ratio) = project_on_segment(position_m, &a, &b);
            let dist = (position_m - closest).norm();

            match best {
                Some((_, _, _, best_dist)) if dist >= best_dist => {
                    if dist > best_dist + exit_margin_m {
                        break;
                    }
                }
                _ => best = Some((i, closest, ratio, dist)),
            }
        }

        let (index, closest, ratio, distance_m) = best?;

        let start = &self.points[index];
        let target = &self.points[index + 1];
        let seg = target.position2() - start.position2();
        let seg_len = seg.norm();

        let lateral_m = if seg_len > 0.0 {
            cross(&seg, &(position_m - start.position2())) / seg_len
        } else {
            distance_m
        };

        let overshoot_m = if index == 0 && ratio < 0.0 {
            -ratio * seg_len
        } else if index == num_segs - 1 && ratio > 1.0 {
            (ratio - 1.0) * seg_len
        } else {
            0.0
        };

        let clamped = ratio.max(0.0).min(1.0);

        Some(Projection {
            index,
            ratio,
            position_m: closest,
            station_m: start.station_m + (target.station_m - start.station_m) * clamped,
            distance_m,
            lateral_m,
            overshoot_m,
        })
    }

    /// Smallest distance between the position and any segment of the path.
    ///
    /// Returns infinity for an empty path.
    pub fn distance_to(&self, position_m: &Vector2<f64>) -> f64 {
        self.project(position_m, 0)
            .map(|p| p.distance_m)
            .unwrap_or(std::f64::INFINITY)
    }

    /// Unit tangent at the given point, from its neighbours.
    ///
    /// Falls back to the point's heading if the neighbours coincide. Returns `None` if the index
    /// is out of bounds.
    pub fn tangent_at(&self, index: usize) -> Option<Vector2<f64>> {
        let point = self.points.get(index)?;

        let prev = &self.points[index.saturating_sub(1)];
        let next = &self.points[(index + 1).min(self.points.len() - 1)];
        let diff = next.position2() - prev.position2();
        let norm = diff.norm();

        if norm > std::f64::EPSILON {
            Some(diff / norm)
        } else {
            Some(Vector2::new(point.heading_rad.cos(), point.heading_rad.sin()))
        }
    }

    /// Convert into a lane message, without any evaluation data.
    pub fn to_lane_msg(&self) -> LaneMsg {
        LaneMsg {
            waypoints: self.points.iter().map(WaypointMsg::from).collect(),
            lane_index: -1,
            ..Default::default()
        }
    }
}

impl From<&LaneMsg> for Path {
    fn from(msg: &LaneMsg) -> Self {
        Self::from_points(msg.waypoints.iter().map(PathPoint::from).collect())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_arc_length_and_interp() {
        let mut path = Path::from_xy(&[(0.0, 0.0), (3.0, 4.0), (3.0, 10.0)]);

        assert_eq!(path.points[1].station_m, 5.0);
        assert_eq!(path.points[2].station_m, 11.0);
        assert_eq!(path.length(), 11.0);

        path.points[0].velocity_ms = 2.0;
        path.points[1].velocity_ms = 4.0;
        path.points[1].gid = 7;

        let p = path.point_at_station(2.5).unwrap();
        assert!((p.position_m.x - 1.5).abs() < 1e-12);
        assert!((p.position_m.y - 2.0).abs() < 1e-12);
        assert!((p.velocity_ms - 3.0).abs() < 1e-12);
        assert_eq!(p.gid, 0);

        let p = path.point_at_station(8.0).unwrap();
        assert_eq!(p.gid, 7);
        assert!((p.position_m.y - 7.0).abs() < 1e-12);

        assert_eq!(path.point_at_station(-1.0).unwrap().station_m, 0.0);
        assert_eq!(path.point_at_station(20.0).unwrap().station_m, 11.0);
        assert!(Path::new_empty().point_at_station(0.0).is_none());
    }

    #[test]
    fn test_approx_eq() {
        let a = Path::from_xy(&[(0.0, 0.0), (1.0, 0.0), (2.0, 0.0)]);
        let b = Path::from_xy(&[(0.0, 0.05), (1.0, 0.0), (2.0, -0.05)]);
        let c = Path::from_xy(&[(0.0, 0.0), (1.0, 0.0)]);

        assert!(a.approx_eq(&b, 0.1));
        assert!(!a.approx_eq(&b, 0.01));
        assert!(!a.approx_eq(&c, 1.0));
    }

    #[test]
    fn test_project() {
        let path = Path::from_xy(&[(0.0, 0.0), (10.0, 0.0), (20.0, 0.0)]);

        let proj = path.project(&Vector2::new(12.0, 2.0), 0).unwrap();
        assert_eq!(proj.index, 1);
        assert_eq!(proj.station_m, 12.0);
        assert_eq!(proj.lateral_m, 2.0);
        assert_eq!(proj.overshoot_m, 0.0);

        let proj = path.project(&Vector2::new(-3.0, -1.0), 0).unwrap();
        assert_eq!(proj.index, 0);
        assert_eq!(proj.station_m, 0.0);
        assert_eq!(proj.lateral_m, -1.0);
        assert!((proj.overshoot_m - 3.0).abs() < 1e-12);

        let proj = path.project(&Vector2::new(25.0, 0.0), 0).unwrap();
        assert!((proj.overshoot_m - 5.0).abs() < 1e-12);

        // Starting the search past the match only looks forward
        let proj = path.project(&Vector2::new(2.0, 0.0), 1).unwrap();
        assert_eq!(proj.index, 1);
        assert_eq!(proj.station_m, 10.0);

        assert_eq!(path.distance_to(&Vector2::new(5.0, 3.0)), 3.0);
    }

    #[test]
    fn test_lane_msg_conversion() {
        let msg = LaneMsg {
            waypoints: vec![
                WaypointMsg {
                    position_m: [0.0, 0.0, 1.0],
                    yaw_rad: 0.0,
                    velocity_ms: 3.0,
                    gid: 12,
                    cost: 0.0,
                },
                WaypointMsg {
                    position_m: [2.0, 0.0, 1.0],
                    yaw_rad: 0.0,
                    velocity_ms: 3.0,
                    gid: 12,
                    cost: 0.0,
                },
            ],
            ..Default::default()
        };

        let path = Path::from(&msg);
        assert_eq!(path.gid(), Some(12));
        assert_eq!(path.points[1].station_m, 2.0);

        let back = path.to_lane_msg();
        assert_eq!(back.waypoints, msg.waypoints);
        assert_eq!(back.lane_index, -1);
    }
}
