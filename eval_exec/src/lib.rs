//! # Trajectory evaluator library.
//!
//! This library allows the executable, the benchmarks and other crates in the workspace to access
//! the evaluator's modules.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Geometry primitives - paths, path points and polygons
pub mod geom;

/// Path preprocessing - resampling, smoothing, annotation and horizon extraction
pub mod preproc;

/// Path synchronisation - keeps the reference paths consistent with the rollouts
pub mod sync;

/// Obstacle adapter - converts detected objects into scored obstacles
pub mod obstacles;

/// Safety envelope - the area swept by the vehicle along a path
pub mod safety;

/// Trajectory evaluation - costs every rollout and selects the winner
pub mod eval;

/// Vehicle state - pose and velocity of the vehicle
pub mod vehicle;

/// Input store - latest inputs shared between the producers and the tick loop
pub mod inputs;

/// Evaluator parameters
pub mod params;

/// Tick core - the cyclic evaluator module
pub mod core;
