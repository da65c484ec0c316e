//! # Path synchronisation
//!
//! Reference paths and rollouts arrive on independent streams. A rollout batch is generated
//! against a specific version of the reference paths, identified by the global path id carried
//! by the points of both. Scoring a batch against a different version of the paths gives
//! meaningless lane costs, so a new reference path set is held pending until a batch generated
//! from it arrives, and only then replaces the active set.
//!
//! ```text
//!           new set            batch with pending id
//!  NoPath ----------> PendingSync -------------------> Active
//!                        ^  |                           |
//!                        |  +---- set equal to active --+
//!                        +-------- new different set ---+
//! ```

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::collections::HashMap;

use log::{info, trace};
use serde::Serialize;

use crate::{geom::Path, params::PreprocParams, preproc};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A set of parallel reference paths received together.
#[derive(Debug, Clone)]
pub struct ReferencePathSet {
    /// Global path id of the set, the gid of the first point of the first path
    pub id: i64,

    /// Paths as received, used to detect re-sent sets
    pub raw: Vec<Path>,

    /// Prepared paths, used for scoring
    pub processed: Vec<Path>,
}

/// A batch of candidate trajectories.
#[derive(Debug, Clone, Default)]
pub struct RolloutBatch {
    /// Global path id the batch was generated from, the gid of the first point of the last
    /// non-empty candidate. `None` if every candidate is empty.
    pub id: Option<i64>,

    pub candidates: Vec<Path>,
}

/// Map from each path's id to its offset in the active set.
#[derive(Debug, Clone, Default)]
pub struct PathIndex {
    offsets: HashMap<i64, usize>,
}

/// Owner of the reference paths and rollouts.
#[derive(Debug, Default)]
pub struct PathSynchronizer {
    equality_tolerance_m: f64,

    active: Option<ReferencePathSet>,
    pending: Option<ReferencePathSet>,

    index: PathIndex,
    hints: Vec<usize>,

    rollouts: Option<RolloutBatch>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// State of the synchroniser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SyncStatus {
    /// No reference path has been received yet
    NoPath,

    /// A new reference path set is waiting for a matching rollout batch
    PendingSync,

    /// The active reference paths match the rollouts
    Active,
}

/// Outcome of feeding an input to the synchroniser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncEvent {
    /// The input changed nothing (re-sent or empty reference paths)
    Ignored,

    /// A new reference path set with the given id is pending
    Pending(i64),

    /// The pending set with the given id became active
    Promoted(i64),

    /// The pending set was dropped as the active set was received again
    PendingDiscarded,

    /// A rollout batch was stored without changing the reference paths
    Accepted,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl ReferencePathSet {
    /// Build a set from raw paths, preparing each of them.
    ///
    /// Returns `None` if there is no path or the first path is empty.
    pub fn new(raw: Vec<Path>, path_density_m: f64, params: &PreprocParams) -> Option<Self> {
        let id = raw.first()?.gid()?;

        let processed = raw
            .iter()
            .map(|p| preproc::prepare(p, path_density_m, params))
            .collect();

        Some(Self { id, raw, processed })
    }

    /// Returns true if both sets contain the same paths within the tolerance.
    pub fn same_paths(&self, raw: &[Path], tolerance_m: f64) -> bool {
        self.raw.len() == raw.len()
            && self
                .raw
                .iter()
                .zip(raw.iter())
                .all(|(a, b)| a.approx_eq(b, tolerance_m))
    }
}

impl RolloutBatch {
    pub fn new(candidates: Vec<Path>) -> Self {
        let id = candidates
            .iter()
            .rev()
            .find(|c| !c.is_empty())
            .and_then(|c| c.gid());

        Self { id, candidates }
    }
}

impl PathIndex {
    fn build(set: &ReferencePathSet) -> Self {
        let mut offsets = HashMap::new();

        for (i, path) in set.raw.iter().enumerate() {
            if let Some(gid) = path.gid() {
                offsets.entry(gid).or_insert(i);
            }
        }

        Self { offsets }
    }

    /// Offset of the path with the given id in the active set.
    pub fn offset(&self, id: i64) -> Option<usize> {
        self.offsets.get(&id).copied()
    }
}

impl PathSynchronizer {
    pub fn new(equality_tolerance_m: f64) -> Self {
        Self {
            equality_tolerance_m,
            ..Default::default()
        }
    }

    /// Handle a newly received set of reference paths.
    ///
    /// The paths are only prepared if the set is a new one.
    pub fn on_reference_paths(
        &mut self,
        raw: Vec<Path>,
        path_density_m: f64,
        params: &PreprocParams,
    ) -> SyncEvent {
        // Compare against the most recently received set
        let latest = self.pending.as_ref().or_else(|| self.active.as_ref());
        if let Some(latest) = latest {
            if latest.same_paths(&raw, self.equality_tolerance_m) {
                trace!("Reference paths unchanged, ignored");
                return SyncEvent::Ignored;
            }
        }

        // Back to the active set, nothing left to wait for
        if self.pending.is_some() {
            if let Some(ref active) = self.active {
                if active.same_paths(&raw, self.equality_tolerance_m) {
                    info!(
                        "Active reference paths (id {}) received again, pending set dropped",
                        active.id
                    );
                    self.pending = None;
                    return SyncEvent::PendingDiscarded;
                }
            }
        }

        match ReferencePathSet::new(raw, path_density_m, params) {
            Some(set) => {
                let id = set.id;
                info!(
                    "New reference path set (id {}, {} paths), waiting for matching rollouts",
                    id,
                    set.raw.len()
                );
                self.pending = Some(set);
                SyncEvent::Pending(id)
            }
            None => {
                trace!("Empty reference path set ignored");
                SyncEvent::Ignored
            }
        }
    }

    /// Handle a newly received rollout batch, which replaces the previous one.
    pub fn on_rollout_batch(&mut self, batch: RolloutBatch) -> SyncEvent {
        let matches_pending = match (&self.pending, batch.id) {
            (Some(pending), Some(id)) => pending.id == id,
            _ => false,
        };

        self.rollouts = Some(batch);

        if !matches_pending {
            return SyncEvent::Accepted;
        }

        match self.pending.take() {
            Some(set) => {
                let id = set.id;
                self.index = PathIndex::build(&set);
                self.hints = vec![0; set.processed.len()];
                self.active = Some(set);
                info!("Reference path set {} is now active", id);
                SyncEvent::Promoted(id)
            }
            None => SyncEvent::Accepted,
        }
    }

    pub fn status(&self) -> SyncStatus {
        match (&self.active, &self.pending) {
            (_, Some(_)) => SyncStatus::PendingSync,
            (Some(_), None) => SyncStatus::Active,
            (None, None) => SyncStatus::NoPath,
        }
    }

    /// The reference path set used for scoring.
    pub fn active(&self) -> Option<&ReferencePathSet> {
        self.active.as_ref()
    }

    pub fn pending(&self) -> Option<&ReferencePathSet> {
        self.pending.as_ref()
    }

    /// The latest rollout batch.
    pub fn rollouts(&self) -> Option<&RolloutBatch> {
        self.rollouts.as_ref()
    }

    pub fn index(&self) -> &PathIndex {
        &self.index
    }

    /// Forward search hint of the given active path.
    pub fn hint(&self, path_index: usize) -> usize {
        self.hints.get(path_index).copied().unwrap_or(0)
    }

    pub fn set_hint(&mut self, path_index: usize, hint: usize) {
        if let Some(h) = self.hints.get_mut(path_index) {
            *h = hint;
        }
    }
}
