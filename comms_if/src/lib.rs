//! # Communications interface crate.
//!
//! Provides the message definitions for every stream consumed or produced by the trajectory
//! evaluator. Messages are plain serde structures, the transport carrying them is left to the
//! executable.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Vehicle pose and velocity messages
pub mod pose;

/// Lane (path) messages, used for reference paths, rollouts and weighted outputs
pub mod lane;

/// Detected object messages
pub mod object;

/// Input envelope used to replay recorded streams
pub mod input;
