//! # Trajectory evaluation
//!
//! Scores every rollout of the latest batch against the obstacles, the reference paths and the
//! behaviour selector's preference, then picks the winner.
//!
//! The cost of a rollout is a weighted sum of three terms:
//!
//! - collision, from the distance to the closest obstacle, scaled up with the vehicle's speed,
//! - continuity, the index distance to the rollout preferred by the behaviour selector,
//! - priority, the distance to the reference path plus a penalty for following too close.
//!
//! Rollouts with an obstacle closer than the minimum avoidance distance are blocked, and are
//! only selected if no free rollout has a valid cost.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod cost;
mod selector;

// ------------------------------------------------------------------------------------------------
// EXPORTS
// ------------------------------------------------------------------------------------------------

pub use cost::{evaluate, CostInputs, TrajectoryCost};
pub use selector::{Selection, Selector};

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Serialize;

use comms_if::lane::{LaneArrayMsg, LaneMsg};

use crate::{
    geom::{Path, Polygon},
    params::EvalParams,
    safety::{self, VehicleDims},
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Result of evaluating one rollout batch.
#[derive(Debug, Clone, Serialize)]
pub struct Evaluation {
    /// Global path id of the evaluated batch
    pub path_id: Option<i64>,

    /// Cost of every candidate, in batch order
    pub costs: Vec<TrajectoryCost>,

    pub winner: Option<TrajectoryCost>,

    /// True if no free candidate could be selected
    pub blocked: bool,

    /// True if the vehicle is not on the primary reference path, the lane term was not used
    pub off_path: bool,

    pub candidates: Vec<Path>,

    /// Safety envelope around the winner, empty if there is none
    pub envelope: Polygon,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Evaluation {
    /// Index of the winning candidate.
    pub fn winner_index(&self) -> Option<usize> {
        self.winner.map(|w| w.index)
    }

    /// Every candidate with its evaluation results attached.
    pub fn weighted_msg(&self) -> LaneArrayMsg {
        LaneArrayMsg {
            lanes: self
                .candidates
                .iter()
                .zip(self.costs.iter())
                .map(|(c, cost)| {
                    let mut lane = c.to_lane_msg();
                    cost.apply_to(&mut lane);
                    lane
                })
                .collect(),
        }
    }

    /// The winning candidate with its evaluation results attached.
    pub fn winner_msg(&self) -> Option<LaneMsg> {
        let winner = self.winner?;
        let mut lane = self.candidates.get(winner.index)?.to_lane_msg();
        winner.apply_to(&mut lane);
        lane.is_blocked = self.blocked;

        Some(lane)
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Evaluate the candidates, select the winner and build its safety envelope.
pub fn run(
    inputs: &CostInputs,
    path_id: Option<i64>,
    params: &EvalParams,
    selector: &mut Selector,
) -> Evaluation {
    let costs = evaluate(inputs, params);
    let selection = selector.select(&costs, params.weights.cost_tie_tolerance);

    let winner = selection.index.and_then(|i| costs.get(i).copied());

    let envelope = match winner.and_then(|w| inputs.candidates.get(w.index)) {
        Some(path) => {
            let dims = VehicleDims::from(&params.car);
            safety::build(
                &safety::ego_prefix(path, dims.length_m),
                &dims,
                params.planning.vertical_safety_distance_m,
                params.planning.horizontal_safety_distance_m,
            )
        }
        None => Polygon::default(),
    };

    Evaluation {
        path_id,
        costs,
        winner,
        blocked: selection.blocked,
        off_path: inputs.off_path(),
        candidates: inputs.candidates.to_vec(),
        envelope,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        obstacles::{self, Footprint, Obstacle, TimedFootprint},
        preproc::Horizon,
        vehicle::VehicleState,
    };
    use nalgebra::Vector2;

    /// Straight candidate along x at the given lateral position, one point per meter.
    fn line(y: f64) -> Path {
        let xy: Vec<(f64, f64)> = (0..=10).map(|x| (x as f64, y)).collect();
        Path::from_xy(&xy)
    }

    fn circle(id: i64, x: f64, y: f64, r: f64) -> Obstacle {
        Obstacle {
            id,
            footprint: Footprint::Circle {
                centre_m: Vector2::new(x, y),
                radius_m: r,
            },
            velocity_ms: Vector2::zeros(),
            predicted: vec![],
        }
    }

    fn horizon(path: Path, off_path: bool) -> Horizon {
        Horizon {
            path,
            hint: 0,
            off_path,
            lateral_offset_m: 0.0,
        }
    }

    fn params() -> EvalParams {
        let mut params = EvalParams::default();
        params.planning.min_distance_to_avoid_m = 1.0;
        params
    }

    fn inputs<'a>(
        candidates: &'a [Path],
        horizons: &'a [Horizon],
        obstacles: &'a [Obstacle],
        vehicle: &'a VehicleState,
        behaviour_index: Option<i64>,
    ) -> CostInputs<'a> {
        CostInputs {
            candidates,
            horizons,
            primary: 0,
            obstacles,
            vehicle,
            behaviour_index,
        }
    }

    #[test]
    fn test_blocked_candidate_not_selected() {
        let params = params();
        let vehicle = VehicleState::default();

        // Closest distances of 10, 0.5 and 3
        let candidates = vec![line(10.0), line(0.5), line(-3.0)];
        let obstacles = vec![circle(1, 8.0, 0.0, 0.0)];

        let eval = run(
            &inputs(&candidates, &[], &obstacles, &vehicle, None),
            Some(1),
            &params,
            &mut Selector::default(),
        );

        let dists: Vec<f64> = eval
            .costs
            .iter()
            .map(|c| c.closest_obstacle_distance_m)
            .collect();
        assert!((dists[0] - 10.0).abs() < 1e-9);
        assert!((dists[1] - 0.5).abs() < 1e-9);
        assert!((dists[2] - 3.0).abs() < 1e-9);

        assert!(!eval.costs[0].blocked);
        assert!(eval.costs[1].blocked);
        assert!(!eval.costs[2].blocked);
        assert!(!eval.blocked);
        assert!(eval.off_path);

        let cheaper = if eval.costs[0].cost <= eval.costs[2].cost {
            0
        } else {
            2
        };
        assert_eq!(eval.winner_index(), Some(cheaper));
        assert!(!eval.envelope.is_empty());
    }

    #[test]
    fn test_all_blocked_fallback() {
        let params = params();
        let vehicle = VehicleState::default();

        let candidates = vec![line(0.0), line(0.5)];
        let obstacles = vec![circle(1, 8.0, 0.0, 1.0)];

        let eval = run(
            &inputs(&candidates, &[], &obstacles, &vehicle, None),
            Some(1),
            &params,
            &mut Selector::default(),
        );

        assert!(eval.costs.iter().all(|c| c.blocked));
        assert!(eval.blocked);
        assert!(eval.winner.is_some());

        let msg = eval.winner_msg().unwrap();
        assert!(msg.is_blocked);
        assert_eq!(msg.lane_index, eval.winner_index().unwrap() as i64);
    }

    #[test]
    fn test_zero_candidates() {
        let params = params();
        let vehicle = VehicleState::default();

        let eval = run(
            &inputs(&[], &[], &[], &vehicle, None),
            None,
            &params,
            &mut Selector::default(),
        );

        assert!(eval.costs.is_empty());
        assert!(eval.winner.is_none());
        assert!(eval.winner_msg().is_none());
        assert!(eval.blocked);
        assert!(eval.envelope.is_empty());
        assert!(eval.weighted_msg().lanes.is_empty());
    }

    #[test]
    fn test_self_obstacle_ignored() {
        let params = params();
        let vehicle = VehicleState::default();
        let candidates = vec![line(-2.0), line(0.0), line(2.0)];

        let clear = evaluate(&inputs(&candidates, &[], &[], &vehicle, None), &params);

        // The vehicle itself, right on the centre candidate
        let raw = vec![circle(0, 3.0, 0.0, 1.0), circle(-1, 6.0, 0.0, 1.0)];
        let filtered = obstacles::filter(raw.clone());
        let with_self = evaluate(&inputs(&candidates, &[], &filtered, &vehicle, None), &params);
        assert_eq!(clear, with_self);

        // Not filtered it would block the centre candidate
        let unfiltered = evaluate(&inputs(&candidates, &[], &raw, &vehicle, None), &params);
        assert!(unfiltered[1].blocked);
    }

    #[test]
    fn test_tie_break_repeats_previous_winner() {
        let params = params();
        let vehicle = VehicleState::default();
        let candidates = vec![line(-4.0), line(0.0), line(4.0)];
        let mut selector = Selector::default();

        // The behaviour selector asks for the left candidate
        let eval = run(
            &inputs(&candidates, &[], &[], &vehicle, Some(2)),
            Some(1),
            &params,
            &mut selector,
        );
        assert_eq!(eval.winner_index(), Some(2));

        // Centre blocked, the outer candidates cost the same
        let obstacles = vec![circle(1, 8.0, 0.0, 0.5)];
        let eval = run(
            &inputs(&candidates, &[], &obstacles, &vehicle, None),
            Some(1),
            &params,
            &mut selector,
        );
        assert!(eval.costs[1].blocked);
        assert_eq!(eval.costs[0].cost, eval.costs[2].cost);
        assert_eq!(eval.winner_index(), Some(2));

        // Without history the lowest index wins
        let eval = run(
            &inputs(&candidates, &[], &obstacles, &vehicle, None),
            Some(1),
            &params,
            &mut Selector::default(),
        );
        assert_eq!(eval.winner_index(), Some(0));
    }

    #[test]
    fn test_lane_term_on_path() {
        let params = params();
        let vehicle = VehicleState::default();
        let candidates = vec![line(-1.0), line(0.0), line(1.0), line(2.0)];
        let horizons = vec![Horizon {
            path: line(0.0),
            hint: 0,
            off_path: false,
            lateral_offset_m: 0.0,
        }];

        let eval = run(
            &inputs(&candidates, &horizons, &[], &vehicle, Some(1)),
            Some(1),
            &params,
            &mut Selector::default(),
        );

        assert!(!eval.off_path);
        assert_eq!(eval.costs[1].priority, 0.0);
        assert!(eval.costs[3].priority > eval.costs[2].priority);
        assert_eq!(eval.winner_index(), Some(1));

        let weighted = eval.weighted_msg();
        assert_eq!(weighted.lanes.len(), 4);
        for (i, lane) in weighted.lanes.iter().enumerate() {
            assert_eq!(lane.lane_index, i as i64);
            assert_eq!(lane.cost, eval.costs[i].cost);
            assert_eq!(lane.closest_object_distance_m, std::f64::INFINITY);
        }
    }

    #[test]
    fn test_predicted_footprints() {
        let mut params = params();
        let vehicle = VehicleState {
            speed_ms: 2.0,
            ..Default::default()
        };
        let candidates = vec![line(0.0)];

        // Far away now, crossing the candidate 2 s from now, reached from station 4 onwards
        let crossing = Obstacle {
            id: 3,
            footprint: Footprint::Circle {
                centre_m: Vector2::new(5.0, 10.0),
                radius_m: 0.0,
            },
            velocity_ms: Vector2::zeros(),
            predicted: vec![
                TimedFootprint {
                    time_s: 0.0,
                    footprint: Footprint::Circle {
                        centre_m: Vector2::new(5.0, 10.0),
                        radius_m: 0.0,
                    },
                },
                TimedFootprint {
                    time_s: 2.0,
                    footprint: Footprint::Circle {
                        centre_m: Vector2::new(8.0, 0.5),
                        radius_m: 0.0,
                    },
                },
            ],
        };
        let obstacles = vec![crossing];

        params.planning.enable_prediction = true;
        let costs = evaluate(&inputs(&candidates, &[], &obstacles, &vehicle, None), &params);
        assert!((costs[0].closest_obstacle_distance_m - 0.5).abs() < 1e-9);
        assert_eq!(costs[0].closest_obstacle_velocity_ms, -2.0);
        assert!(costs[0].blocked);

        params.planning.enable_prediction = false;
        let costs = evaluate(&inputs(&candidates, &[], &obstacles, &vehicle, None), &params);
        assert!((costs[0].closest_obstacle_distance_m - 10.0).abs() < 1e-9);
        assert!(!costs[0].blocked);
    }

    #[test]
    fn test_envelope_intrusion() {
        let params = params();
        let vehicle = VehicleState::default();
        let candidates = vec![line(0.0), line(-4.0)];

        // Alongside the vehicle body, 1.5 m from the centre candidate
        let obstacles = vec![circle(2, 3.0, 1.8, 0.3)];

        let costs = evaluate(&inputs(&candidates, &[], &obstacles, &vehicle, None), &params);

        assert_eq!(costs[0].closest_obstacle_distance_m, 0.0);
        assert!(costs[0].blocked);
        assert!((costs[0].collision - params.weights.collision).abs() < 1e-12);

        assert!((costs[1].closest_obstacle_distance_m - 5.5).abs() < 1e-9);
        assert!(!costs[1].blocked);
    }

    #[test]
    fn test_relative_velocity() {
        let params = params();
        let vehicle = VehicleState {
            speed_ms: 2.0,
            ..Default::default()
        };
        let candidates = vec![line(0.0)];

        let mut moving = circle(4, 6.0, 3.0, 0.0);
        moving.velocity_ms = Vector2::new(3.0, 4.0);
        let obstacles = vec![moving];

        let eval = run(
            &inputs(&candidates, &[], &obstacles, &vehicle, None),
            Some(1),
            &params,
            &mut Selector::default(),
        );

        assert!((eval.costs[0].closest_obstacle_distance_m - 3.0).abs() < 1e-9);
        assert!((eval.costs[0].closest_obstacle_velocity_ms - 1.0).abs() < 1e-12);

        let msg = eval.winner_msg().unwrap();
        assert!((msg.closest_object_velocity_ms - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_lane_change_nearest_reference() {
        let mut params = params();
        let vehicle = VehicleState::default();

        // Lateral extent normalisation: one rollout spacing of 0.5 m from the centre
        let candidates = vec![line(0.0), line(1.0), line(3.0)];
        let horizons = vec![
            horizon(line(0.0), false),
            horizon(line(3.0), false),
            horizon(line(1.0), true),
        ];
        let weight = params.weights.priority;

        params.planning.enable_lane_change = false;
        let costs = evaluate(&inputs(&candidates, &horizons, &[], &vehicle, None), &params);
        assert_eq!(costs[0].priority, 0.0);
        assert!((costs[1].priority - weight * 2.0).abs() < 1e-9);
        assert!((costs[2].priority - weight * 6.0).abs() < 1e-9);

        // Off path references are not candidates for a lane change
        params.planning.enable_lane_change = true;
        let costs = evaluate(&inputs(&candidates, &horizons, &[], &vehicle, None), &params);
        assert_eq!(costs[0].priority, 0.0);
        assert!((costs[1].priority - weight * 2.0).abs() < 1e-9);
        assert_eq!(costs[2].priority, 0.0);
    }
}
