//! # Tick core
//!
//! The cyclic evaluator module. Each tick takes a snapshot of the inputs and:
//!
//! 1. feeds the queued reference path sets and rollout batches to the synchroniser, in their
//!    arrival order,
//! 2. updates the vehicle state,
//! 3. extracts the horizon of every active reference path,
//! 4. evaluates the latest rollout batch and selects the winner.
//!
//! Until a pose has been received and a reference path set is active the module is warming up
//! and produces no evaluation. Processing never fails, every degraded condition is reported in
//! the output instead.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::convert::Infallible;

use chrono::Utc;
use log::{info, trace, warn};
use serde::Serialize;
use thiserror::Error;

use util::{
    archive::{ArchiveError, Archived, Archiver},
    module::State,
    params::{self, LoadError},
    session::{self, Session},
    time::duration_to_seconds,
};

use crate::{
    eval::{self, CostInputs, Evaluation, Selector},
    geom::Path,
    inputs::{InputSnapshot, PathEvent},
    obstacles::{self, Obstacle},
    params::EvalParams,
    preproc::{extract_horizon, Horizon},
    sync::{PathSynchronizer, RolloutBatch, SyncEvent, SyncStatus},
    vehicle::VehicleState,
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Trajectory evaluator module state
pub struct TrajEval {
    params: EvalParams,

    sync: PathSynchronizer,

    selector: Selector,

    vehicle: VehicleState,

    /// Off path status of the previous tick
    off_path: bool,

    num_ticks: u64,

    last_selection: Option<SelectionRecord>,
    arch_selection: Archiver,
}

/// Status report for evaluator processing.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct StatusReport {
    pub sync_status: SyncStatus,

    /// Id of the reference path set used for scoring
    pub active_path_id: Option<i64>,

    pub num_candidates: usize,

    /// Number of obstacles left after filtering
    pub num_obstacles: usize,

    pub selected: Option<usize>,

    pub blocked: bool,

    pub off_path: bool,

    /// Age of the latest pose
    pub pose_age_s: Option<f64>,
}

/// A selection as written into the archive.
#[derive(Debug, Clone, Copy, Serialize)]
struct SelectionRecord {
    time_s: f64,
    tick: u64,
    path_id: Option<i64>,
    num_candidates: usize,
    selected: Option<usize>,
    cost: Option<f64>,
    closest_obstacle_distance_m: Option<f64>,
    blocked: bool,
    off_path: bool,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Output of one tick.
#[derive(Debug, Clone)]
pub enum TickOutput {
    /// Not enough inputs yet to evaluate anything
    WarmUp(WarmUpReason),

    Evaluated(Evaluation),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum WarmUpReason {
    /// No pose received yet
    NoPose,

    /// No reference path set is active yet
    NoPath,
}

/// Errors raised during the evaluator's initialisation.
#[derive(Debug, Error)]
pub enum TrajEvalInitError {
    #[error("Failed to load the evaluator parameters: {0}")]
    ParamLoad(LoadError),

    #[error("Failed to open the selection archive: {0}")]
    Archive(ArchiveError),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for TrajEval {
    fn default() -> Self {
        Self::new(EvalParams::default().finalise())
    }
}

impl TrajEval {
    /// Create a new evaluator without archiving, used when no session is available.
    pub fn new(params: EvalParams) -> Self {
        Self {
            sync: PathSynchronizer::new(params.sync.path_equality_tolerance_m),
            params,
            selector: Selector::default(),
            vehicle: VehicleState::default(),
            off_path: false,
            num_ticks: 0,
            last_selection: None,
            arch_selection: Archiver::default(),
        }
    }

    pub fn sync_status(&self) -> SyncStatus {
        self.sync.status()
    }

    /// Feed the queued path events to the synchroniser.
    fn apply_path_events(&mut self, events: &[PathEvent]) {
        for event in events {
            match event {
                PathEvent::ReferencePaths(msg) => {
                    let raw = msg.lanes.iter().map(Path::from).collect();
                    self.sync.on_reference_paths(
                        raw,
                        self.params.planning.path_density_m,
                        &self.params.preproc,
                    );
                }
                PathEvent::Rollouts(msg) => {
                    let batch = RolloutBatch::new(msg.lanes.iter().map(Path::from).collect());

                    // Indices of a batch from a new path set are unrelated to the previous ones
                    if let SyncEvent::Promoted(_) = self.sync.on_rollout_batch(batch) {
                        self.selector.reset();
                    }
                }
            }
        }
    }

    /// Extract the horizon of every active reference path, updating the search hints.
    fn extract_horizons(&mut self) -> Vec<Horizon> {
        let position_m = self.vehicle.position2();
        let planning = &self.params.planning;

        let horizons: Vec<Horizon> = match self.sync.active() {
            Some(active) => active
                .processed
                .iter()
                .enumerate()
                .map(|(i, path)| {
                    extract_horizon(
                        path,
                        &position_m,
                        planning.horizon_distance_m,
                        planning.path_density_m,
                        self.sync.hint(i),
                        &self.params.preproc,
                    )
                })
                .collect(),
            None => vec![],
        };

        for (i, h) in horizons.iter().enumerate() {
            self.sync.set_hint(i, h.hint);
        }

        horizons
    }
}

impl State for TrajEval {
    type InitData = &'static str;
    type InitError = TrajEvalInitError;

    type InputData = InputSnapshot;
    type OutputData = TickOutput;
    type StatusReport = StatusReport;
    type ProcError = Infallible;

    /// Initialise the evaluator.
    ///
    /// Expected init data is the path to the parameter file
    fn init(&mut self, init_data: Self::InitData, session: &Session) -> Result<(), Self::InitError> {
        let params: EvalParams = params::load(init_data).map_err(TrajEvalInitError::ParamLoad)?;

        *self = Self::new(params.finalise());

        self.arch_selection = Archiver::from_path(session, "traj_eval/selection.csv")
            .map_err(TrajEvalInitError::Archive)?;

        Ok(())
    }

    /// Perform one evaluation tick.
    fn proc(
        &mut self,
        input_data: &Self::InputData,
    ) -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError> {
        self.num_ticks += 1;
        self.last_selection = None;

        self.apply_path_events(&input_data.path_events);

        // ---- VEHICLE STATE ----

        if let Some((ref pose, stamp)) = input_data.pose {
            self.vehicle.update_pose(pose, stamp);
        }
        self.vehicle.update_velocity(
            self.params.velocity_source,
            input_data.twist.as_ref(),
            input_data.odometry.as_ref(),
            input_data.can_info.as_ref(),
            &self.params.car,
        );

        let mut report = StatusReport {
            sync_status: self.sync.status(),
            active_path_id: self.sync.active().map(|a| a.id),
            num_candidates: 0,
            num_obstacles: 0,
            selected: None,
            blocked: false,
            off_path: false,
            pose_age_s: self
                .vehicle
                .last_update
                .and_then(|t| duration_to_seconds(Utc::now() - t)),
        };

        // ---- WARM UP ----

        if !self.vehicle.has_pose() {
            trace!("No pose yet, warming up");
            return Ok((TickOutput::WarmUp(WarmUpReason::NoPose), report));
        }
        if self.sync.active().is_none() {
            trace!("No active reference path yet, warming up");
            return Ok((TickOutput::WarmUp(WarmUpReason::NoPath), report));
        }

        // ---- EVALUATION ----

        let horizons = self.extract_horizons();

        let obstacles = obstacles::filter(input_data.objects.iter().map(Obstacle::from).collect());

        let (candidates, path_id) = match self.sync.rollouts() {
            Some(batch) => (batch.candidates.as_slice(), batch.id),
            None => (&[][..], None),
        };

        let inputs = CostInputs {
            candidates,
            horizons: &horizons,
            primary: path_id
                .and_then(|id| self.sync.index().offset(id))
                .unwrap_or(0),
            obstacles: &obstacles,
            vehicle: &self.vehicle,
            behaviour_index: input_data.behaviour_index,
        };

        let evaluation = eval::run(&inputs, path_id, &self.params, &mut self.selector);

        if evaluation.off_path && !self.off_path {
            warn!("Vehicle is off the reference path, scoring against obstacles only");
        } else if !evaluation.off_path && self.off_path {
            info!("Vehicle is back on the reference path");
        }
        self.off_path = evaluation.off_path;

        report.num_candidates = evaluation.costs.len();
        report.num_obstacles = obstacles.len();
        report.selected = evaluation.winner_index();
        report.blocked = evaluation.blocked;
        report.off_path = evaluation.off_path;

        self.last_selection = Some(SelectionRecord {
            time_s: session::get_elapsed_seconds(),
            tick: self.num_ticks,
            path_id,
            num_candidates: evaluation.costs.len(),
            selected: evaluation.winner_index(),
            cost: evaluation.winner.map(|w| w.cost),
            closest_obstacle_distance_m: evaluation
                .winner
                .map(|w| w.closest_obstacle_distance_m),
            blocked: evaluation.blocked,
            off_path: evaluation.off_path,
        });

        Ok((TickOutput::Evaluated(evaluation), report))
    }
}

impl Archived for TrajEval {
    /// Write the selection made in the last tick, if any.
    fn write(&mut self) -> Result<(), ArchiveError> {
        match self.last_selection.take() {
            Some(record) => self.arch_selection.serialise(record),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use comms_if::{
        lane::{LaneArrayMsg, LaneMsg, WaypointMsg},
        object::{DetectedObjectMsg, FootprintMsg},
        pose::PoseMsg,
    };

    /// Straight lane along x at the given lateral position, every point tagged with `gid`.
    fn lane(gid: i64, y: f64) -> LaneMsg {
        LaneMsg {
            waypoints: (0..=20)
                .map(|x| WaypointMsg {
                    position_m: [x as f64, y, 0.0],
                    yaw_rad: 0.0,
                    velocity_ms: 2.0,
                    gid,
                    cost: 0.0,
                })
                .collect(),
            ..Default::default()
        }
    }

    fn lanes(gid: i64, ys: &[f64]) -> LaneArrayMsg {
        LaneArrayMsg {
            lanes: ys.iter().map(|&y| lane(gid, y)).collect(),
        }
    }

    fn pose(x: f64, y: f64) -> Option<(PoseMsg, chrono::DateTime<Utc>)> {
        Some((
            PoseMsg {
                position_m: [x, y, 0.0],
                yaw_rad: 0.0,
            },
            Utc::now(),
        ))
    }

    fn evaluated(output: TickOutput) -> Evaluation {
        match output {
            TickOutput::Evaluated(e) => e,
            TickOutput::WarmUp(r) => panic!("Expected an evaluation, got a warm up ({:?})", r),
        }
    }

    #[test]
    fn test_warm_up() {
        let mut te = TrajEval::default();

        let (out, report) = te.proc(&InputSnapshot::default()).unwrap();
        assert!(matches!(out, TickOutput::WarmUp(WarmUpReason::NoPose)));
        assert_eq!(report.sync_status, SyncStatus::NoPath);

        // Pose but the reference paths are still waiting for their rollouts
        let snap = InputSnapshot {
            pose: pose(0.0, 0.0),
            path_events: vec![PathEvent::ReferencePaths(lanes(1, &[0.0]))],
            ..Default::default()
        };
        let (out, report) = te.proc(&snap).unwrap();
        assert!(matches!(out, TickOutput::WarmUp(WarmUpReason::NoPath)));
        assert_eq!(report.sync_status, SyncStatus::PendingSync);
    }

    #[test]
    fn test_sync_across_ticks() {
        let mut te = TrajEval::default();

        // Set A (id 1) then a batch from it, in the same tick
        let snap = InputSnapshot {
            pose: pose(0.0, 0.0),
            path_events: vec![
                PathEvent::ReferencePaths(lanes(1, &[0.0])),
                PathEvent::Rollouts(lanes(1, &[-0.5, 0.0, 0.5])),
            ],
            ..Default::default()
        };
        let (out, report) = te.proc(&snap).unwrap();
        let eval = evaluated(out);
        assert_eq!(report.sync_status, SyncStatus::Active);
        assert_eq!(report.active_path_id, Some(1));
        assert_eq!(eval.path_id, Some(1));
        assert!(!eval.off_path);
        assert_eq!(eval.winner_index(), Some(1));
        assert!(!eval.envelope.is_empty());

        // Set B (id 2) arrives, A is still used
        let snap = InputSnapshot {
            pose: pose(0.0, 0.0),
            path_events: vec![PathEvent::ReferencePaths(lanes(2, &[3.0]))],
            ..Default::default()
        };
        let (out, report) = te.proc(&snap).unwrap();
        let eval = evaluated(out);
        assert_eq!(report.sync_status, SyncStatus::PendingSync);
        assert_eq!(report.active_path_id, Some(1));
        assert_eq!(eval.path_id, Some(1));

        // The batch generated from B promotes it
        let snap = InputSnapshot {
            pose: pose(0.0, 0.0),
            path_events: vec![PathEvent::Rollouts(lanes(2, &[2.5, 3.0, 3.5]))],
            ..Default::default()
        };
        let (out, report) = te.proc(&snap).unwrap();
        let eval = evaluated(out);
        assert_eq!(report.sync_status, SyncStatus::Active);
        assert_eq!(report.active_path_id, Some(2));
        assert_eq!(eval.path_id, Some(2));
        assert_eq!(eval.candidates.len(), 3);
        assert_eq!(eval.winner_index(), Some(1));
    }

    #[test]
    fn test_off_path_and_obstacles() {
        let mut te = TrajEval::default();

        let snap = InputSnapshot {
            pose: pose(0.0, 50.0),
            path_events: vec![
                PathEvent::ReferencePaths(lanes(1, &[0.0])),
                PathEvent::Rollouts(lanes(1, &[-3.0, 0.0, 3.0])),
            ],
            objects: vec![
                DetectedObjectMsg {
                    id: 4,
                    footprint: FootprintMsg::Circle {
                        centre_m: [10.0, 0.0],
                        radius_m: 0.5,
                    },
                    velocity_ms: [0.0, 0.0],
                    predicted: vec![],
                },
                // The vehicle itself
                DetectedObjectMsg {
                    id: 0,
                    footprint: FootprintMsg::Circle {
                        centre_m: [10.0, 3.0],
                        radius_m: 1.0,
                    },
                    velocity_ms: [0.0, 0.0],
                    predicted: vec![],
                },
            ],
            ..Default::default()
        };

        let (out, report) = te.proc(&snap).unwrap();
        let eval = evaluated(out);
        assert!(eval.off_path);
        assert!(report.off_path);
        assert_eq!(report.num_obstacles, 1);

        assert!(eval.costs[1].blocked);
        assert!(!eval.costs[0].blocked);
        assert!(!eval.costs[2].blocked);
        assert_eq!(eval.costs[0].cost, eval.costs[2].cost);
        assert_eq!(eval.winner_index(), Some(0));
    }

    #[test]
    fn test_archive_without_session() {
        let mut te = TrajEval::default();

        assert!(te.write().is_ok());

        let snap = InputSnapshot {
            pose: pose(0.0, 0.0),
            path_events: vec![
                PathEvent::ReferencePaths(lanes(1, &[0.0])),
                PathEvent::Rollouts(lanes(1, &[0.0])),
            ],
            ..Default::default()
        };
        te.proc(&snap).unwrap();
        assert!(te.last_selection.is_some());
        assert!(te.write().is_ok());
        assert!(te.last_selection.is_none());
    }
}
