//! Cyclic module interface
//!
//! A cyclic module is initialised once from its parameter file and then
//! processed once per tick of the executable's main loop. Every cyclic module
//! in `eval_exec` implements [`State`].

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use crate::session::Session;

// ---------------------------------------------------------------------------
// MODULE STATE
// ---------------------------------------------------------------------------

/// The internal state of a cyclic module.
pub trait State {
    /// Data needed to initialise the module, usually the parameter file name
    type InitData;
    type InitError;

    /// Inputs consumed by one tick
    type InputData;
    /// Result of one tick
    type OutputData;
    /// Diagnostics of one tick, kept separate from the output so that they
    /// can be logged or archived on their own
    type StatusReport;
    /// Error raised by a tick. Modules which always produce an output use
    /// `std::convert::Infallible`.
    type ProcError;

    /// Initialise the module, opening any archives inside the session.
    ///
    /// Initialising again resets the module.
    fn init(&mut self, init_data: Self::InitData, session: &Session)
        -> Result<(), Self::InitError>;

    /// Process one tick.
    ///
    /// On success returns the tick's output and status report.
    fn proc(&mut self, input_data: &Self::InputData)
        -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError>;
}
