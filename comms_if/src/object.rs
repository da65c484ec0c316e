//! # Detected object messages

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A closed 2D polygon given by its vertices.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct PolygonMsg {
    pub points_m: Vec<[f64; 2]>,
}

/// A footprint valid at a given time after the object's stamp.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TimedFootprintMsg {
    pub time_s: f64,
    pub footprint: FootprintMsg,
}

/// An object reported by the perception/prediction stack.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct DetectedObjectMsg {
    /// Object id, ids of zero or less are reserved for the vehicle itself
    pub id: i64,

    pub footprint: FootprintMsg,

    #[serde(default)]
    pub velocity_ms: [f64; 2],

    /// Predicted footprints, in ascending time order
    #[serde(default)]
    pub predicted: Vec<TimedFootprintMsg>,
}

/// Every object detected in one perception cycle.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct DetectedObjectArrayMsg {
    pub objects: Vec<DetectedObjectMsg>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Shape of an object on the ground plane.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum FootprintMsg {
    Polygon(PolygonMsg),

    Circle { centre_m: [f64; 2], radius_m: f64 },
}
