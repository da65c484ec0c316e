//! # Lane messages
//!
//! A lane is an ordered list of waypoints. The same message is used for the reference paths
//! received from the global planner, for the rollouts produced by the local generator and for
//! the weighted trajectories published by the evaluator.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A single waypoint of a lane.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct WaypointMsg {
    pub position_m: [f64; 3],

    #[serde(default)]
    pub yaw_rad: f64,

    #[serde(default)]
    pub velocity_ms: f64,

    /// Id of the global path this waypoint originates from
    #[serde(default)]
    pub gid: i64,

    #[serde(default)]
    pub cost: f64,
}

/// A lane, with the evaluation results attached when published by the evaluator.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct LaneMsg {
    pub waypoints: Vec<WaypointMsg>,

    /// Distance to the closest obstacle along this lane
    #[serde(default)]
    pub closest_object_distance_m: f64,

    /// Velocity of the closest obstacle relative to the vehicle, along the lane
    #[serde(default)]
    pub closest_object_velocity_ms: f64,

    #[serde(default)]
    pub cost: f64,

    #[serde(default)]
    pub is_blocked: bool,

    /// Index of this lane in its batch, -1 if not set
    #[serde(default = "no_index")]
    pub lane_index: i64,
}

/// A set of lanes received or published together.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct LaneArrayMsg {
    pub lanes: Vec<LaneMsg>,
}

/// Trajectory index requested by the behaviour selector.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct BehaviourMsg {
    pub trajectory_index: i64,
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn no_index() -> i64 {
    -1
}
