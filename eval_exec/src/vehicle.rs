//! # Vehicle state
//!
//! Pose and velocity of the vehicle, updated from the latest input messages at the start of each
//! tick.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use chrono::{DateTime, Utc};
use comms_if::pose::{CanInfoMsg, OdometryMsg, PoseMsg, TwistMsg};
use nalgebra::{Vector2, Vector3};
use serde::Serialize;

use crate::params::{CarParams, VelocitySource};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Below this speed the steering angle is not updated from the twist, the yaw rate is too noisy.
const TWIST_STEER_MIN_SPEED_MS: f64 = 0.25;

/// Below this speed the steering angle is not updated from odometry.
const ODOM_STEER_MIN_SPEED_MS: f64 = 0.1;

const KMH_TO_MS: f64 = 1.0 / 3.6;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Snapshot of the vehicle's state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VehicleState {
    pub position_m: Vector3<f64>,

    pub heading_rad: f64,

    pub speed_ms: f64,

    pub steer_rad: f64,

    /// Time of the last pose update, `None` until a pose has been received
    pub last_update: Option<DateTime<Utc>>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for VehicleState {
    fn default() -> Self {
        Self {
            position_m: Vector3::zeros(),
            heading_rad: 0.0,
            speed_ms: 0.0,
            steer_rad: 0.0,
            last_update: None,
        }
    }
}

impl VehicleState {
    /// Position of the vehicle on the ground plane
    pub fn position2(&self) -> Vector2<f64> {
        Vector2::new(self.position_m.x, self.position_m.y)
    }

    /// True once a pose has been received
    pub fn has_pose(&self) -> bool {
        self.last_update.is_some()
    }

    pub fn update_pose(&mut self, msg: &PoseMsg, stamp: DateTime<Utc>) {
        self.position_m = Vector3::new(msg.position_m[0], msg.position_m[1], msg.position_m[2]);
        self.heading_rad = msg.yaw_rad;
        self.last_update = Some(stamp);
    }

    pub fn update_twist(&mut self, msg: &TwistMsg, car: &CarParams) {
        self.apply_twist(msg, car, TWIST_STEER_MIN_SPEED_MS);
    }

    pub fn update_odometry(&mut self, msg: &OdometryMsg, car: &CarParams) {
        self.apply_twist(&msg.twist, car, ODOM_STEER_MIN_SPEED_MS);
    }

    pub fn update_can(&mut self, msg: &CanInfoMsg, car: &CarParams) {
        self.speed_ms = msg.speed_kmh * KMH_TO_MS;

        if car.max_steer_value != 0.0 {
            self.steer_rad = msg.angle * car.max_steer_angle_rad / car.max_steer_value;
        }
    }

    /// Apply whichever of the velocity messages comes from the configured source.
    pub fn update_velocity(
        &mut self,
        source: VelocitySource,
        twist: Option<&TwistMsg>,
        odometry: Option<&OdometryMsg>,
        can_info: Option<&CanInfoMsg>,
        car: &CarParams,
    ) {
        match source {
            VelocitySource::Twist => {
                if let Some(m) = twist {
                    self.update_twist(m, car)
                }
            }
            VelocitySource::Odometry => {
                if let Some(m) = odometry {
                    self.update_odometry(m, car)
                }
            }
            VelocitySource::CanInfo => {
                if let Some(m) = can_info {
                    self.update_can(m, car)
                }
            }
        }
    }

    fn apply_twist(&mut self, twist: &TwistMsg, car: &CarParams, steer_min_speed_ms: f64) {
        self.speed_ms = twist.linear_x_ms;

        if twist.linear_x_ms.abs() > steer_min_speed_ms {
            self.steer_rad = (car.wheel_base_m * twist.angular_z_rads / twist.linear_x_ms).atan();
        }
    }
}
