//! # Polygon

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::object::PolygonMsg;
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

use super::{distance_to_segment, segments_intersect};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A simple closed polygon on the ground plane.
///
/// The last vertex connects back to the first one, the closing vertex is not repeated.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    pub points_m: Vec<Vector2<f64>>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Polygon {
    pub fn new(points_m: Vec<Vector2<f64>>) -> Self {
        Self { points_m }
    }

    pub fn is_empty(&self) -> bool {
        self.points_m.is_empty()
    }

    /// Iterate over the edges of the polygon as `(start, end)` pairs.
    pub fn edges(&self) -> impl Iterator<Item = (&Vector2<f64>, &Vector2<f64>)> + '_ {
        let n = self.points_m.len();
        (0..n).map(move |i| (&self.points_m[i], &self.points_m[(i + 1) % n]))
    }

    /// Returns true if the point lies inside the polygon, using ray casting.
    pub fn contains(&self, p: &Vector2<f64>) -> bool {
        if self.points_m.len() < 3 {
            return false;
        }

        let mut inside = false;

        for (a, b) in self.edges() {
            if (a.y > p.y) != (b.y > p.y) {
                let x_cross = a.x + (p.y - a.y) / (b.y - a.y) * (b.x - a.x);
                if p.x < x_cross {
                    inside = !inside;
                }
            }
        }

        inside
    }

    /// Distance from the point to the polygon, zero if the point is inside.
    ///
    /// An empty polygon is infinitely far away.
    pub fn distance_to(&self, p: &Vector2<f64>) -> f64 {
        match self.points_m.len() {
            0 => std::f64::INFINITY,
            1 => (p - self.points_m[0]).norm(),
            _ => {
                if self.contains(p) {
                    return 0.0;
                }

                self.edges()
                    .map(|(a, b)| distance_to_segment(p, a, b))
                    .fold(std::f64::INFINITY, f64::min)
            }
        }
    }

    /// Returns true if the two polygons overlap or touch.
    pub fn intersects(&self, other: &Polygon) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }

        // One fully inside the other
        if self.points_m.iter().any(|p| other.contains(p))
            || other.points_m.iter().any(|p| self.contains(p))
        {
            return true;
        }

        self.edges()
            .any(|(a0, a1)| other.edges().any(|(b0, b1)| segments_intersect(a0, a1, b0, b1)))
    }

    pub fn to_msg(&self) -> PolygonMsg {
        PolygonMsg {
            points_m: self.points_m.iter().map(|p| [p.x, p.y]).collect(),
        }
    }
}

impl From<&PolygonMsg> for Polygon {
    fn from(msg: &PolygonMsg) -> Self {
        Self {
            points_m: msg
                .points_m
                .iter()
                .map(|p| Vector2::new(p[0], p[1]))
                .collect(),
        }
    }
}
