//! # Input store
//!
//! Producers (the transport, or the replay thread) push messages into the store as they
//! arrive. Once per tick the evaluator takes a snapshot of it, holding the lock only for the
//! copy.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use chrono::{DateTime, Utc};
use comms_if::{
    input::InputMsg,
    lane::LaneArrayMsg,
    object::DetectedObjectMsg,
    pose::{CanInfoMsg, OdometryMsg, PoseMsg, TwistMsg},
};
use log::trace;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Shared handle on the latest inputs, cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct InputStore {
    inner: Arc<Mutex<Latest>>,
}

/// Everything the evaluator needs for one tick.
#[derive(Debug, Clone, Default)]
pub struct InputSnapshot {
    /// Latest pose and the time it was received
    pub pose: Option<(PoseMsg, DateTime<Utc>)>,

    pub twist: Option<TwistMsg>,

    pub odometry: Option<OdometryMsg>,

    pub can_info: Option<CanInfoMsg>,

    pub objects: Vec<DetectedObjectMsg>,

    pub behaviour_index: Option<i64>,

    /// Reference path sets and rollout batches received since the last snapshot, in order
    pub path_events: Vec<PathEvent>,
}

#[derive(Debug, Default)]
struct Latest {
    pose: Option<(PoseMsg, DateTime<Utc>)>,
    twist: Option<TwistMsg>,
    odometry: Option<OdometryMsg>,
    can_info: Option<CanInfoMsg>,
    objects: Vec<DetectedObjectMsg>,
    behaviour_index: Option<i64>,
    path_events: VecDeque<PathEvent>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Path inputs, which must reach the synchroniser in their arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum PathEvent {
    ReferencePaths(LaneArrayMsg),
    Rollouts(LaneArrayMsg),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl InputStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a newly received message.
    pub fn push(&self, msg: InputMsg) {
        trace!("Input received on {}", msg.stream_name());

        let mut latest = self.lock();

        match msg {
            InputMsg::Pose(m) => latest.pose = Some((m, Utc::now())),
            InputMsg::Twist(m) => latest.twist = Some(m),
            InputMsg::Odometry(m) => latest.odometry = Some(m),
            InputMsg::CanInfo(m) => latest.can_info = Some(m),
            InputMsg::Objects(m) => latest.objects = m.objects,
            InputMsg::Behaviour(m) => latest.behaviour_index = Some(m.trajectory_index),
            InputMsg::ReferencePaths(m) => {
                latest.path_events.push_back(PathEvent::ReferencePaths(m))
            }
            InputMsg::Rollouts(m) => latest.path_events.push_back(PathEvent::Rollouts(m)),
        }
    }

    /// Copy the latest values and drain the queued path events.
    pub fn snapshot(&self) -> InputSnapshot {
        let mut latest = self.lock();

        InputSnapshot {
            pose: latest.pose,
            twist: latest.twist,
            odometry: latest.odometry,
            can_info: latest.can_info,
            objects: latest.objects.clone(),
            behaviour_index: latest.behaviour_index,
            path_events: latest.path_events.drain(..).collect(),
        }
    }

    /// Number of path events waiting for the next snapshot.
    pub fn num_pending_events(&self) -> usize {
        self.lock().path_events.len()
    }

    /// The stored values are plain data, a panic while holding the lock cannot leave them
    /// half-updated, so a poisoned lock is recovered.
    fn lock(&self) -> MutexGuard<'_, Latest> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use comms_if::{
        lane::{BehaviourMsg, LaneMsg},
        object::DetectedObjectArrayMsg,
    };

    fn lanes(n: usize) -> LaneArrayMsg {
        LaneArrayMsg {
            lanes: vec![LaneMsg::default(); n],
        }
    }

    #[test]
    fn test_latest_value_wins() {
        let store = InputStore::new();

        store.push(InputMsg::Twist(TwistMsg {
            linear_x_ms: 1.0,
            angular_z_rads: 0.0,
        }));
        store.push(InputMsg::Twist(TwistMsg {
            linear_x_ms: 2.0,
            angular_z_rads: 0.0,
        }));
        store.push(InputMsg::Behaviour(BehaviourMsg {
            trajectory_index: 3,
        }));
        store.push(InputMsg::Objects(DetectedObjectArrayMsg { objects: vec![] }));

        let snap = store.snapshot();
        assert_eq!(snap.twist.map(|t| t.linear_x_ms), Some(2.0));
        assert_eq!(snap.behaviour_index, Some(3));
        assert!(snap.pose.is_none());

        // Latest values survive the snapshot
        assert_eq!(store.snapshot().twist.map(|t| t.linear_x_ms), Some(2.0));
    }

    #[test]
    fn test_path_events_in_order() {
        let store = InputStore::new();
        let producer = store.clone();

        producer.push(InputMsg::ReferencePaths(lanes(1)));
        producer.push(InputMsg::Rollouts(lanes(2)));
        producer.push(InputMsg::ReferencePaths(lanes(3)));
        assert_eq!(store.num_pending_events(), 3);

        let snap = store.snapshot();
        assert_eq!(
            snap.path_events,
            vec![
                PathEvent::ReferencePaths(lanes(1)),
                PathEvent::Rollouts(lanes(2)),
                PathEvent::ReferencePaths(lanes(3)),
            ]
        );

        // Drained
        assert!(store.snapshot().path_events.is_empty());
    }

    #[test]
    fn test_poisoned_lock_recovered() {
        let store = InputStore::new();
        let producer = store.clone();

        let _ = std::thread::spawn(move || {
            let _guard = producer.inner.lock().unwrap();
            panic!("producer died");
        })
        .join();

        store.push(InputMsg::Behaviour(BehaviourMsg {
            trajectory_index: 1,
        }));
        assert_eq!(store.snapshot().behaviour_index, Some(1));
    }
}
