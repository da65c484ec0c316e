//! # Obstacle adapter
//!
//! Converts detected objects into the obstacles used for scoring.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::object::{DetectedObjectMsg, FootprintMsg, TimedFootprintMsg};
use nalgebra::Vector2;
use serde::Serialize;

use crate::geom::Polygon;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// An obstacle and its predicted motion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Obstacle {
    /// Object id, zero or less for the vehicle itself
    pub id: i64,

    /// Current footprint
    pub footprint: Footprint,

    pub velocity_ms: Vector2<f64>,

    /// Predicted footprints in ascending time order, may be empty
    pub predicted: Vec<TimedFootprint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimedFootprint {
    /// Time after now at which the footprint is valid
    pub time_s: f64,

    pub footprint: Footprint,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Shape of an obstacle on the ground.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Footprint {
    Polygon(Polygon),

    Circle {
        centre_m: Vector2<f64>,
        radius_m: f64,
    },
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Footprint {
    /// Distance from the point to the footprint, zero inside.
    pub fn distance_to(&self, p: &Vector2<f64>) -> f64 {
        match self {
            Footprint::Polygon(poly) => poly.distance_to(p),
            Footprint::Circle { centre_m, radius_m } => ((p - centre_m).norm() - radius_m).max(0.0),
        }
    }

    /// Returns true if the footprint overlaps the polygon.
    pub fn intersects(&self, polygon: &Polygon) -> bool {
        match self {
            Footprint::Polygon(poly) => poly.intersects(polygon),
            Footprint::Circle { centre_m, radius_m } => polygon.distance_to(centre_m) <= *radius_m,
        }
    }
}

impl From<&FootprintMsg> for Footprint {
    fn from(msg: &FootprintMsg) -> Self {
        match msg {
            FootprintMsg::Polygon(poly) => Footprint::Polygon(Polygon::from(poly)),
            FootprintMsg::Circle { centre_m, radius_m } => Footprint::Circle {
                centre_m: Vector2::new(centre_m[0], centre_m[1]),
                radius_m: *radius_m,
            },
        }
    }
}

impl From<&TimedFootprintMsg> for TimedFootprint {
    fn from(msg: &TimedFootprintMsg) -> Self {
        Self {
            time_s: msg.time_s,
            footprint: Footprint::from(&msg.footprint),
        }
    }
}

impl Obstacle {
    /// Footprint of the obstacle at `time_s` from now.
    ///
    /// This is the last predicted footprint at or before the time, the first one if the time is
    /// before the prediction starts. Without a prediction the current footprint is returned.
    pub fn footprint_at(&self, time_s: f64) -> &Footprint {
        let after = self.predicted.partition_point(|f| f.time_s <= time_s);

        match after {
            _ if self.predicted.is_empty() => &self.footprint,
            0 => &self.predicted[0].footprint,
            n => &self.predicted[n - 1].footprint,
        }
    }
}

impl From<&DetectedObjectMsg> for Obstacle {
    fn from(msg: &DetectedObjectMsg) -> Self {
        Self {
            id: msg.id,
            footprint: Footprint::from(&msg.footprint),
            velocity_ms: Vector2::new(msg.velocity_ms[0], msg.velocity_ms[1]),
            predicted: msg.predicted.iter().map(TimedFootprint::from).collect(),
        }
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Drop the obstacles describing the vehicle itself (`id <= 0`), keeping the others in order.
pub fn filter(raw: Vec<Obstacle>) -> Vec<Obstacle> {
    raw.into_iter().filter(|o| o.id > 0).collect()
}

#[cfg(test)]
mod test {
    use super::*;

    fn circle(x: f64, y: f64, r: f64) -> Footprint {
        Footprint::Circle {
            centre_m: Vector2::new(x, y),
            radius_m: r,
        }
    }

    fn obstacle(id: i64) -> Obstacle {
        Obstacle {
            id,
            footprint: circle(0.0, 0.0, 1.0),
            velocity_ms: Vector2::zeros(),
            predicted: vec![],
        }
    }

    #[test]
    fn test_filter() {
        let kept = filter(vec![obstacle(3), obstacle(0), obstacle(-1), obstacle(1)]);
        let ids: Vec<i64> = kept.iter().map(|o| o.id).collect();

        assert_eq!(ids, vec![3, 1]);
    }

    #[test]
    fn test_footprint_at() {
        let mut o = obstacle(1);
        assert_eq!(o.footprint_at(2.0), &o.footprint);

        o.predicted = vec![
            TimedFootprint {
                time_s: 0.5,
                footprint: circle(1.0, 0.0, 1.0),
            },
            TimedFootprint {
                time_s: 1.0,
                footprint: circle(2.0, 0.0, 1.0),
            },
        ];

        assert_eq!(o.footprint_at(0.0), &circle(1.0, 0.0, 1.0));
        assert_eq!(o.footprint_at(0.7), &circle(1.0, 0.0, 1.0));
        assert_eq!(o.footprint_at(1.0), &circle(2.0, 0.0, 1.0));
        assert_eq!(o.footprint_at(9.0), &circle(2.0, 0.0, 1.0));
    }

    #[test]
    fn test_footprint_geometry() {
        let c = circle(0.0, 0.0, 1.0);
        assert_eq!(c.distance_to(&Vector2::new(3.0, 0.0)), 2.0);
        assert_eq!(c.distance_to(&Vector2::new(0.5, 0.0)), 0.0);

        let square = Polygon::new(vec![
            Vector2::new(1.5, -1.0),
            Vector2::new(3.0, -1.0),
            Vector2::new(3.0, 1.0),
            Vector2::new(1.5, 1.0),
        ]);
        assert!(!c.intersects(&square));
        assert!(circle(1.0, 0.0, 1.0).intersects(&square));
        assert!(Footprint::Polygon(square.clone()).intersects(&square));
    }
}
