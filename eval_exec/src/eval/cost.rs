//! Cost evaluation of candidate trajectories

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use nalgebra::Vector2;
use serde::Serialize;

use comms_if::lane::LaneMsg;
use util::maths::{clamp, lin_map, unit_ratio};

use crate::{
    geom::Path,
    obstacles::Obstacle,
    params::{EvalParams, PlanningParams},
    preproc::Horizon,
    safety::{self, VehicleDims},
    vehicle::VehicleState,
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Cost of one candidate trajectory.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrajectoryCost {
    /// Index of the candidate in its batch
    pub index: usize,

    /// Total cost, the sum of the weighted terms
    pub cost: f64,

    /// True if an obstacle is closer than the minimum avoidance distance
    pub blocked: bool,

    /// Infinite when there are no obstacles
    pub closest_obstacle_distance_m: f64,

    /// Velocity of the closest obstacle along the candidate, relative to the vehicle
    pub closest_obstacle_velocity_ms: f64,

    /// Weighted collision term
    pub collision: f64,

    /// Weighted continuity term
    pub continuity: f64,

    /// Weighted priority term
    pub priority: f64,
}

/// Everything the cost evaluation looks at in one tick.
pub struct CostInputs<'a> {
    pub candidates: &'a [Path],

    /// Horizon windows of every active reference path
    pub horizons: &'a [Horizon],

    /// Index of the reference path the candidates were generated from
    pub primary: usize,

    /// Obstacles, already filtered
    pub obstacles: &'a [Obstacle],

    pub vehicle: &'a VehicleState,

    /// Trajectory index requested by the behaviour selector
    pub behaviour_index: Option<i64>,
}

/// The obstacle closest to a candidate.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Closest {
    distance_m: f64,
    velocity_ms: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl TrajectoryCost {
    /// Copy the evaluation results into a lane message.
    pub fn apply_to(&self, lane: &mut LaneMsg) {
        lane.cost = self.cost;
        lane.is_blocked = self.blocked;
        lane.closest_object_distance_m = self.closest_obstacle_distance_m;
        lane.closest_object_velocity_ms = self.closest_obstacle_velocity_ms;
        lane.lane_index = self.index as i64;
    }
}

impl<'a> CostInputs<'a> {
    /// True if the vehicle is not on the primary reference path.
    pub fn off_path(&self) -> bool {
        self.horizons
            .get(self.primary)
            .map(|h| h.off_path || h.path.is_empty())
            .unwrap_or(true)
    }
}

impl Default for Closest {
    fn default() -> Self {
        Self {
            distance_m: std::f64::INFINITY,
            velocity_ms: 0.0,
        }
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Evaluate the cost of every candidate.
pub fn evaluate(inputs: &CostInputs, params: &EvalParams) -> Vec<TrajectoryCost> {
    let planning = &params.planning;
    let weights = &params.weights;
    let dims = VehicleDims::from(&params.car);

    let n = inputs.candidates.len();
    let centre = n / 2;
    let behaviour = match inputs.behaviour_index {
        Some(b) if b >= 0 && (b as usize) < n => b as usize,
        _ => centre,
    };
    let off_path = inputs.off_path();
    let speed_scale = 1.0
        + planning.speed_profile_factor
            * unit_ratio(
                inputs.vehicle.speed_ms,
                planning.min_velocity_ms,
                planning.max_velocity_ms,
            );

    inputs
        .candidates
        .iter()
        .enumerate()
        .map(|(i, candidate)| {
            let mut closest =
                closest_obstacle(candidate, inputs.obstacles, inputs.vehicle, planning);

            if let Some(intruder) =
                intrusion(candidate, inputs.obstacles, inputs.vehicle, &dims, planning)
            {
                closest = intruder;
            }

            let collision = collision_term(closest.distance_m, planning);
            let continuity = continuity_term(i, n, behaviour);

            let lane = if off_path {
                0.0
            } else {
                lane_term(candidate, inputs.horizons, inputs.primary, centre, planning)
            };
            let priority = lane + following_term(closest.distance_m, planning);

            let w_collision = weights.collision * speed_scale * collision;
            let w_continuity = weights.continuity * continuity;
            let w_priority = weights.priority * priority;

            TrajectoryCost {
                index: i,
                cost: w_collision + w_continuity + w_priority,
                blocked: closest.distance_m < planning.min_distance_to_avoid_m,
                closest_obstacle_distance_m: closest.distance_m,
                closest_obstacle_velocity_ms: closest.velocity_ms,
                collision: w_collision,
                continuity: w_continuity,
                priority: w_priority,
            }
        })
        .collect()
}

/// Find the obstacle closest to the candidate.
///
/// With prediction enabled each point of the candidate is checked against the footprint the
/// obstacle is predicted to have when the vehicle gets there.
fn closest_obstacle(
    candidate: &Path,
    obstacles: &[Obstacle],
    vehicle: &VehicleState,
    planning: &PlanningParams,
) -> Closest {
    let mut closest = Closest::default();
    let speed_ms = vehicle.speed_ms.max(planning.min_velocity_ms);

    for (j, point) in candidate.points.iter().enumerate() {
        let pos = point.position2();
        let time_s = if speed_ms > 0.0 {
            point.station_m / speed_ms
        } else {
            0.0
        };

        for obstacle in obstacles {
            let footprint = if planning.enable_prediction {
                obstacle.footprint_at(time_s)
            } else {
                &obstacle.footprint
            };

            let distance_m = footprint.distance_to(&pos);
            if distance_m < closest.distance_m {
                closest = Closest {
                    distance_m,
                    velocity_ms: relative_velocity(candidate, j, obstacle, vehicle),
                };
            }
        }
    }

    closest
}

/// Check the obstacles' current footprints against the safety envelope around the part of the
/// candidate covered by the vehicle body.
fn intrusion(
    candidate: &Path,
    obstacles: &[Obstacle],
    vehicle: &VehicleState,
    dims: &VehicleDims,
    planning: &PlanningParams,
) -> Option<Closest> {
    if obstacles.is_empty() || candidate.is_empty() {
        return None;
    }

    let envelope = safety::build(
        &safety::ego_prefix(candidate, dims.length_m),
        dims,
        planning.vertical_safety_distance_m,
        planning.horizontal_safety_distance_m,
    );

    obstacles
        .iter()
        .find(|o| o.footprint.intersects(&envelope))
        .map(|o| Closest {
            distance_m: 0.0,
            velocity_ms: relative_velocity(candidate, 0, o, vehicle),
        })
}

fn relative_velocity(
    candidate: &Path,
    index: usize,
    obstacle: &Obstacle,
    vehicle: &VehicleState,
) -> f64 {
    let tangent = candidate
        .tangent_at(index)
        .unwrap_or_else(|| Vector2::new(1.0, 0.0));

    obstacle.velocity_ms.dot(&tangent) - vehicle.speed_ms
}

/// Zero beyond the maximum avoidance distance, one at or below the minimum one.
fn collision_term(distance_m: f64, planning: &PlanningParams) -> f64 {
    let min = planning.min_distance_to_avoid_m;
    let max = planning.max_distance_to_avoid_m;

    if distance_m <= min {
        1.0
    } else if distance_m >= max {
        0.0
    } else {
        clamp(lin_map((max, min), (0.0, 1.0), distance_m), 0.0, 1.0)
    }
}

/// Normalised index distance between the candidate and the behaviour's preferred one.
fn continuity_term(index: usize, num_candidates: usize, behaviour: usize) -> f64 {
    let span = num_candidates.saturating_sub(1).max(1) as f64;
    (index as f64 - behaviour as f64).abs() / span
}

/// Mean distance of the candidate's points from the reference path, normalised by the lateral
/// extent of the rollouts.
///
/// With lane changes allowed the distance is taken to the nearest reference path.
fn lane_term(
    candidate: &Path,
    horizons: &[Horizon],
    primary: usize,
    centre: usize,
    planning: &PlanningParams,
) -> f64 {
    if candidate.is_empty() {
        return 0.0;
    }

    let refs: Vec<&Path> = if planning.enable_lane_change {
        horizons
            .iter()
            .filter(|h| !h.off_path && !h.path.is_empty())
            .map(|h| &h.path)
            .collect()
    } else {
        horizons
            .get(primary)
            .filter(|h| !h.path.is_empty())
            .map(|h| &h.path)
            .into_iter()
            .collect()
    };

    if refs.is_empty() {
        return 0.0;
    }

    let total_m: f64 = candidate
        .points
        .iter()
        .map(|p| {
            let pos = p.position2();
            refs.iter()
                .map(|r| r.distance_to(&pos))
                .fold(std::f64::INFINITY, f64::min)
        })
        .sum();
    let mean_m = total_m / candidate.len() as f64;

    let norm_m = planning.roll_out_density_m * (centre.max(1) as f64);
    if norm_m > 0.0 {
        mean_m / norm_m
    } else {
        0.0
    }
}

/// Penalty for getting closer than the following distance to an obstacle.
fn following_term(distance_m: f64, planning: &PlanningParams) -> f64 {
    let min_following = planning.min_following_distance_m;

    if planning.enable_following && min_following > 0.0 && distance_m < min_following {
        (min_following - distance_m) / min_following
    } else {
        0.0
    }
}
