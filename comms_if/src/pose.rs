//! # Pose and velocity messages

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Current pose of the vehicle in the map frame.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct PoseMsg {
    /// Position of the vehicle's reference point
    pub position_m: [f64; 3],

    /// Heading about the z axis
    pub yaw_rad: f64,
}

/// Body frame velocity as reported by the velocity estimator.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct TwistMsg {
    pub linear_x_ms: f64,
    pub angular_z_rads: f64,
}

/// Odometry, a pose and the twist measured at that pose.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct OdometryMsg {
    pub pose: PoseMsg,
    pub twist: TwistMsg,
}

/// Vehicle CAN bus status.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct CanInfoMsg {
    /// Vehicle speed in km/h
    pub speed_kmh: f64,

    /// Raw steering wheel value, scaled by the vehicle's steering calibration
    pub angle: f64,
}
