//! # Evaluator input envelope
//!
//! Every stream the evaluator listens to, wrapped into one enum so that recordings can be
//! replayed in their original interleaving.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    lane::{BehaviourMsg, LaneArrayMsg},
    object::DetectedObjectArrayMsg,
    pose::{CanInfoMsg, OdometryMsg, PoseMsg, TwistMsg},
};

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// A message on one of the evaluator's input streams.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum InputMsg {
    /// Current vehicle pose
    Pose(PoseMsg),

    /// Velocity from the twist estimator
    Twist(TwistMsg),

    /// Velocity from odometry
    Odometry(OdometryMsg),

    /// Velocity from the CAN bus
    CanInfo(CanInfoMsg),

    /// A new set of reference paths from the global planner
    ReferencePaths(LaneArrayMsg),

    /// A new batch of rollouts from the local generator
    Rollouts(LaneArrayMsg),

    /// Predicted obstacles
    Objects(DetectedObjectArrayMsg),

    /// Preferred trajectory index from the behaviour selector
    Behaviour(BehaviourMsg),
}

/// Possible parsing errors.
#[derive(Debug, Error)]
pub enum InputParseError {
    #[error("Input message contains invalid JSON: {0}")]
    InvalidJson(serde_json::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl InputMsg {
    /// Parse an input message from a JSON string
    pub fn from_json(json_str: &str) -> Result<Self, InputParseError> {
        serde_json::from_str(json_str).map_err(InputParseError::InvalidJson)
    }

    /// Name of the stream carrying this message, used in logs
    pub fn stream_name(&self) -> &'static str {
        match self {
            InputMsg::Pose(_) => "pose",
            InputMsg::Twist(_) => "twist",
            InputMsg::Odometry(_) => "odometry",
            InputMsg::CanInfo(_) => "can_info",
            InputMsg::ReferencePaths(_) => "reference_paths",
            InputMsg::Rollouts(_) => "rollouts",
            InputMsg::Objects(_) => "objects",
            InputMsg::Behaviour(_) => "behaviour",
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::object::FootprintMsg;

    #[test]
    fn test_parse_inputs() {
        let msg = InputMsg::from_json(r#"{"Pose": {"position_m": [1.0, 2.0, 0.0], "yaw_rad": 0.5}}"#)
            .unwrap();
        assert_eq!(
            msg,
            InputMsg::Pose(PoseMsg {
                position_m: [1.0, 2.0, 0.0],
                yaw_rad: 0.5
            })
        );
        assert_eq!(msg.stream_name(), "pose");

        let msg = InputMsg::from_json(
            r#"{"Rollouts": {"lanes": [{"waypoints": [{"position_m": [0.0, 0.0, 0.0], "gid": 4}]}]}}"#,
        )
        .unwrap();
        match msg {
            InputMsg::Rollouts(arr) => {
                assert_eq!(arr.lanes[0].waypoints[0].gid, 4);
                assert_eq!(arr.lanes[0].lane_index, -1);
            }
            _ => panic!("Expected a rollout batch"),
        }

        let msg = InputMsg::from_json(
            r#"{"Objects": {"objects": [{"id": 3, "footprint": {"Circle": {"centre_m": [5.0, 0.0], "radius_m": 1.0}}}]}}"#,
        )
        .unwrap();
        match msg {
            InputMsg::Objects(arr) => {
                assert!(matches!(arr.objects[0].footprint, FootprintMsg::Circle { .. }));
                assert!(arr.objects[0].predicted.is_empty());
            }
            _ => panic!("Expected objects"),
        }

        assert!(InputMsg::from_json("{\"Nope\": 1}").is_err());
    }
}
