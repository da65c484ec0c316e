//! # Replay script interpreter module
//!
//! This module provides an interpreter for timed replay scripts, which allow
//! recorded input messages to be played back into an executable.
//!
//! A script is a sequence of entries of the form
//!
//! ```text
//! <time_s>: <json message>;
//! ```
//!
//! where `time_s` is the time after the start of the replay at which the
//! message is released. Entries must be given in ascending time order.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use regex::RegexBuilder;
use serde::de::DeserializeOwned;
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A message which is scripted to be released at a specific time.
struct Entry<M> {
    /// The time the message is supposed to be released at
    exec_time_s: f64,

    msg: M,
}

/// A script interpreter.
///
/// After initialising with the path to the script use `get_pending` to
/// acquire the list of messages that are due.
pub struct ScriptInterpreter<M> {
    script_path: PathBuf,
    entries: VecDeque<Entry<M>>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("Could not find the script at {0:?}")]
    ScriptNotFound(PathBuf),

    #[error("Could not load the script: {0}")]
    ScriptLoadError(std::io::Error),

    #[error("The script is empty (or is so bad it can't be read)")]
    ScriptEmpty,

    #[error("Script contains an invalid timestamp: {0}. Should be a float (like 1.0)")]
    InvalidTimestamp(String),

    #[error("Script entries are out of order, {1} s comes after {0} s")]
    OutOfOrder(f64, f64),

    #[error("Script contains an invalid message at {0} s: {1}")]
    InvalidMessage(f64, serde_json::Error),
}

/// Messages due for release.
pub enum Pending<M> {
    None,
    Some(Vec<M>),
    EndOfScript,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<M: DeserializeOwned> ScriptInterpreter<M> {
    /// Create a new interpreter from the given script path.
    pub fn new<P: AsRef<Path>>(script_path: P) -> Result<Self, ScriptError> {
        let path = PathBuf::from(script_path.as_ref());

        if !path.exists() {
            return Err(ScriptError::ScriptNotFound(path));
        }

        let script = fs::read_to_string(&path).map_err(ScriptError::ScriptLoadError)?;

        let mut interp = Self::from_str(&script)?;
        interp.script_path = path;

        Ok(interp)
    }

    /// Parse a script held in memory.
    pub fn from_str(script: &str) -> Result<Self, ScriptError> {
        let mut entries: VecDeque<Entry<M>> = VecDeque::new();

        // The pattern is a literal, it will always build
        let re = RegexBuilder::new(r"^\s*(\d+(\.\d+)?)\s*:\s*([^;]*);")
            .multi_line(true)
            .build()
            .expect("Invalid script pattern");

        for cap in re.captures_iter(script) {
            let exec_time_s: f64 = cap[1]
                .parse()
                .map_err(|e| ScriptError::InvalidTimestamp(format!("{}", e)))?;

            if let Some(last) = entries.back() {
                if exec_time_s < last.exec_time_s {
                    return Err(ScriptError::OutOfOrder(last.exec_time_s, exec_time_s));
                }
            }

            let msg = serde_json::from_str(&cap[3])
                .map_err(|e| ScriptError::InvalidMessage(exec_time_s, e))?;

            entries.push_back(Entry { exec_time_s, msg });
        }

        if entries.is_empty() {
            return Err(ScriptError::ScriptEmpty);
        }

        Ok(Self {
            script_path: PathBuf::new(),
            entries,
        })
    }
}

impl<M> ScriptInterpreter<M> {
    /// Return the messages due at `current_time_s` (seconds since the start of the replay).
    pub fn get_pending(&mut self, current_time_s: f64) -> Pending<M> {
        if self.entries.is_empty() {
            return Pending::EndOfScript;
        }

        let mut msgs = vec![];

        while self
            .entries
            .front()
            .map(|e| e.exec_time_s <= current_time_s)
            .unwrap_or(false)
        {
            if let Some(e) = self.entries.pop_front() {
                msgs.push(e.msg);
            }
        }

        if msgs.is_empty() {
            Pending::None
        } else {
            Pending::Some(msgs)
        }
    }

    /// Get the number of messages remaining in the script
    pub fn get_num_msgs(&self) -> usize {
        self.entries.len()
    }

    /// Get the length of the script in seconds
    pub fn get_duration(&self) -> f64 {
        self.entries.back().map(|e| e.exec_time_s).unwrap_or(0.0)
    }

    /// Path the script was loaded from, empty for in-memory scripts.
    pub fn script_path(&self) -> &Path {
        &self.script_path
    }
}
