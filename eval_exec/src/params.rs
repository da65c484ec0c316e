//! # Trajectory Evaluator Parameters
//!
//! Parameters are loaded once from `traj_eval.toml` and passed by reference to every stage.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Parameters for the trajectory evaluator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EvalParams {
    pub planning: PlanningParams,

    pub car: CarParams,

    pub preproc: PreprocParams,

    pub weights: CostWeights,

    pub sync: SyncParams,

    /// Which velocity stream drives the vehicle speed
    pub velocity_source: VelocitySource,
}

/// Planning behaviour parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanningParams {
    /// Lateral margin added to the vehicle's half width when building the safety envelope.
    ///
    /// Units: meters
    pub horizontal_safety_distance_m: f64,

    /// Longitudinal margin added ahead of and behind the safety envelope.
    ///
    /// Units: meters
    pub vertical_safety_distance_m: f64,

    /// Allow swerving around obstacles through the rollouts. Forces following on.
    pub enable_swerving: bool,

    /// Penalise rollouts which get closer than `min_following_distance_m` to an obstacle.
    pub enable_following: bool,

    pub max_velocity_ms: f64,

    /// Lower bound on the speed used to estimate arrival times along a rollout.
    pub min_velocity_ms: f64,

    /// Spacing of reference path points and horizon samples.
    ///
    /// Units: meters
    pub path_density_m: f64,

    /// Lateral spacing between two adjacent rollouts.
    ///
    /// Units: meters
    pub roll_out_density_m: f64,

    /// Number of rollouts on each side of the centre one.
    pub roll_outs_number: usize,

    /// Length of the forward window extracted from each reference path.
    ///
    /// Units: meters
    pub horizon_distance_m: f64,

    pub min_following_distance_m: f64,

    /// Obstacles closer than this block a rollout.
    ///
    /// Units: meters
    pub min_distance_to_avoid_m: f64,

    /// Obstacles further than this add no collision cost.
    ///
    /// Units: meters
    pub max_distance_to_avoid_m: f64,

    /// Gain of the speed dependant scaling of the collision cost.
    pub speed_profile_factor: f64,

    /// Measure the lane cost against the nearest reference path rather than the primary one.
    pub enable_lane_change: bool,

    /// Use predicted obstacle footprints rather than their current ones.
    pub enable_prediction: bool,
}

/// Vehicle geometry and capabilities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CarParams {
    pub width_m: f64,

    pub length_m: f64,

    pub wheel_base_m: f64,

    pub turning_radius_m: f64,

    /// Steering angle reached at `max_steer_value`.
    ///
    /// Units: radians
    pub max_steer_angle_rad: f64,

    /// Raw CAN steering value at full lock.
    pub max_steer_value: f64,

    pub max_acceleration_mss: f64,

    pub max_deceleration_mss: f64,
}

/// Reference path preprocessing parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreprocParams {
    /// Pull of each point towards its original position while smoothing.
    pub smoothing_data_weight: f64,

    /// Pull of each point towards the mean of its neighbours while smoothing.
    pub smoothing_smooth_weight: f64,

    /// Smoothing stops when no point moves more than this in one iteration.
    ///
    /// Units: meters
    pub smoothing_tolerance_m: f64,

    /// Number of smoothing passes applied to a newly received path.
    pub smoothing_passes: usize,

    /// Maximum lateral distance from the reference path before the vehicle is off it.
    ///
    /// Units: meters
    pub off_path_lateral_tolerance_m: f64,

    /// Maximum distance beyond either end of the reference path before the vehicle is off it.
    ///
    /// Units: meters
    pub off_path_longitudinal_tolerance_m: f64,

    /// The closest segment search stops once segments are this much further than the best one.
    ///
    /// Units: meters
    pub scan_exit_margin_m: f64,
}

/// Weights of the cost terms.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostWeights {
    pub collision: f64,

    pub continuity: f64,

    pub priority: f64,

    /// Costs within this of the minimum are considered equal when selecting.
    pub cost_tie_tolerance: f64,
}

/// Path synchronisation parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncParams {
    /// Paths whose points are all within this distance of each other are the same path.
    ///
    /// Units: meters
    pub path_equality_tolerance_m: f64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Source of the vehicle's velocity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VelocitySource {
    Odometry,
    Twist,
    CanInfo,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl EvalParams {
    /// Apply the couplings between parameters.
    ///
    /// Swerving needs following to be enabled. Without swerving no side rollouts are expected.
    pub fn finalise(mut self) -> Self {
        if self.planning.enable_swerving {
            self.planning.enable_following = true;
        } else {
            self.planning.roll_outs_number = 0;
        }

        self
    }
}

impl Default for PlanningParams {
    fn default() -> Self {
        Self {
            horizontal_safety_distance_m: 1.2,
            vertical_safety_distance_m: 0.8,
            enable_swerving: true,
            enable_following: true,
            max_velocity_ms: 6.0,
            min_velocity_ms: 0.1,
            path_density_m: 0.5,
            roll_out_density_m: 0.5,
            roll_outs_number: 6,
            horizon_distance_m: 50.0,
            min_following_distance_m: 15.0,
            min_distance_to_avoid_m: 2.0,
            max_distance_to_avoid_m: 15.0,
            speed_profile_factor: 1.2,
            enable_lane_change: false,
            enable_prediction: true,
        }
    }
}

impl Default for CarParams {
    fn default() -> Self {
        Self {
            width_m: 1.85,
            length_m: 4.2,
            wheel_base_m: 2.7,
            turning_radius_m: 5.2,
            max_steer_angle_rad: 0.45,
            max_steer_value: 660.0,
            max_acceleration_mss: 3.0,
            max_deceleration_mss: -3.0,
        }
    }
}

impl Default for PreprocParams {
    fn default() -> Self {
        Self {
            smoothing_data_weight: 0.48,
            smoothing_smooth_weight: 0.2,
            smoothing_tolerance_m: 0.05,
            smoothing_passes: 3,
            off_path_lateral_tolerance_m: 5.0,
            off_path_longitudinal_tolerance_m: 2.0,
            scan_exit_margin_m: 10.0,
        }
    }
}

impl Default for CostWeights {
    fn default() -> Self {
        Self {
            collision: 2.0,
            continuity: 1.0,
            priority: 0.5,
            cost_tie_tolerance: 1e-3,
        }
    }
}

impl Default for SyncParams {
    fn default() -> Self {
        Self {
            path_equality_tolerance_m: 0.1,
        }
    }
}

impl Default for VelocitySource {
    fn default() -> Self {
        VelocitySource::Twist
    }
}
