//! Trajectory evaluator executable entry point.
//!
//! # Architecture
//!
//! The general execution methodology consists of:
//!
//!     - Initialise the session, logger and evaluator
//!     - Start the replay thread, which pushes the recorded inputs into the input store at their
//!       recorded times
//!     - Main loop, at 50 Hz:
//!         - Snapshot the input store
//!         - Evaluator processing
//!         - Archive the selection
//!         - Once a second, save the weighted rollouts and the safety envelope
//!
//! The executable stops once the replay script has ended and every input has been processed.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

// External
use color_eyre::{
    eyre::{eyre, WrapErr},
    Report,
};
use log::{debug, info, trace, warn};
use std::env;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::thread;
use std::time::{Duration, Instant};

// Internal
use comms_if::input::InputMsg;
use eval_lib::{
    core::{TickOutput, TrajEval},
    inputs::InputStore,
};
use util::{
    archive::Archived,
    logger::{logger_init, LevelFilter},
    module::State,
    script_interpreter::{Pending, ScriptInterpreter},
    session::{self, Session},
};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Target period of one cycle.
const CYCLE_PERIOD_S: f64 = 0.02;

/// Number of cycles per second, the inverse of `CYCLE_PERIOD_S`
const CYCLE_FREQUENCY_HZ: u64 = 50;

/// Polling period of the replay thread.
const REPLAY_POLL_PERIOD_S: f64 = 0.001;

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    // ---- EARLY INITIALISATION ----

    let session = Session::new("eval_exec", "sessions").wrap_err("Failed to create the session")?;

    logger_init(LevelFilter::Debug, &session).wrap_err("Failed to initialise logging")?;

    info!("Trajectory Evaluator Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD REPLAY SCRIPT ----

    let args: Vec<String> = env::args().collect();

    debug!("CLI arguments: {:?}", args);

    if args.len() != 2 {
        return Err(eyre!(
            "Expected a single argument (the replay script), found {}",
            args.len() - 1
        ));
    }

    info!("Loading replay script from \"{}\"", &args[1]);

    let si: ScriptInterpreter<InputMsg> =
        ScriptInterpreter::new(&args[1]).wrap_err("Failed to load the replay script")?;

    info!(
        "Loaded script {:?} lasts {:.02} s and contains {} messages\n",
        si.script_path(),
        si.get_duration(),
        si.get_num_msgs()
    );

    // ---- INITIALISE MODULES ----

    info!("Initialising modules...");

    let mut traj_eval = TrajEval::default();
    traj_eval
        .init("traj_eval.toml", &session)
        .wrap_err("Failed to initialise TrajEval")?;
    info!("TrajEval init complete");

    info!("Module initialisation complete\n");

    // ---- START REPLAY ----

    let store = InputStore::new();
    let script_ended = Arc::new(AtomicBool::new(false));

    let replay_jh = {
        let store = store.clone();
        let script_ended = script_ended.clone();
        thread::Builder::new()
            .name("replay".into())
            .spawn(move || replay(si, store, script_ended))
            .wrap_err("Failed to start the replay thread")?
    };

    // ---- MAIN LOOP ----

    info!("Begining main loop\n");

    let mut num_cycles: u64 = 0;

    loop {
        let cycle_start_instant = Instant::now();

        // Read before the snapshot so that every message of the script is in it
        let ended = script_ended.load(Ordering::SeqCst);

        // ---- EVALUATION ----

        let snapshot = store.snapshot();

        let (output, report) = match traj_eval.proc(&snapshot) {
            Ok(o) => o,
            Err(e) => match e {},
        };

        trace!("TrajEval status: {:?}", report);

        match output {
            TickOutput::WarmUp(reason) => {
                if num_cycles % CYCLE_FREQUENCY_HZ == 0 {
                    info!("Warming up: {:?}", reason);
                }
            }
            TickOutput::Evaluated(evaluation) => {
                match evaluation.winner {
                    Some(w) => debug!(
                        "Selected trajectory {} of {} (cost {:.04}, closest obstacle {:.02} m{}{})",
                        w.index,
                        evaluation.costs.len(),
                        w.cost,
                        w.closest_obstacle_distance_m,
                        if evaluation.blocked { ", blocked" } else { "" },
                        if evaluation.off_path { ", off path" } else { "" },
                    ),
                    None => debug!("No trajectory to select"),
                }

                if num_cycles % CYCLE_FREQUENCY_HZ == 0 {
                    session::save_with_timestamp(
                        "traj_eval/weighted.json",
                        evaluation.weighted_msg(),
                    );
                    session::save_with_timestamp(
                        "traj_eval/envelope.json",
                        evaluation.envelope.to_msg(),
                    );
                }
            }
        }

        // ---- WRITE ARCHIVES ----

        if let Err(e) = traj_eval.write() {
            warn!("Could not write the TrajEval archive: {}", e);
        }

        num_cycles += 1;

        if ended && store.num_pending_events() == 0 {
            info!("End of replay script reached, stopping");
            break;
        }

        // ---- CYCLE MANAGEMENT ----

        let cycle_dur = Instant::now() - cycle_start_instant;

        match Duration::from_secs_f64(CYCLE_PERIOD_S).checked_sub(cycle_dur) {
            Some(d) => thread::sleep(d),
            None => warn!(
                "Cycle overran by {:.06} s",
                cycle_dur.as_secs_f64() - CYCLE_PERIOD_S
            ),
        }
    }

    // ---- SHUTDOWN ----

    if replay_jh.join().is_err() {
        warn!("Replay thread panicked");
    }

    info!(
        "Processed {} cycles, path synchronisation ended in {:?}",
        num_cycles,
        traj_eval.sync_status()
    );

    session.exit();

    info!("End of execution");

    Ok(())
}

/// Push the script's messages into the store as they become due.
fn replay(mut si: ScriptInterpreter<InputMsg>, store: InputStore, script_ended: Arc<AtomicBool>) {
    let start_instant = Instant::now();

    loop {
        match si.get_pending(start_instant.elapsed().as_secs_f64()) {
            Pending::None => thread::sleep(Duration::from_secs_f64(REPLAY_POLL_PERIOD_S)),
            Pending::Some(msgs) => {
                for msg in msgs {
                    store.push(msg);
                }
            }
            Pending::EndOfScript => break,
        }
    }

    script_ended.store(true, Ordering::SeqCst);
}
