//! Test utilities for driving the scheduler
//!
//! The tick loop belongs to an external driver; these helpers play that
//! role for unit tests. Richer scripted workloads (arrival times,
//! resource-holding spans) live in the `tests_scheduling` crate.

use crate::{SchedError, Simulation};
use core_types::{Pid, Priority, Ticks};

/// Admits a batch of `(lifespan, priority)` pairs, returning pids in
/// admission order
pub fn admit_all(sim: &mut Simulation, batch: &[(u64, i32)]) -> Result<Vec<Pid>, SchedError> {
    batch
        .iter()
        .map(|&(lifespan, priority)| sim.admit(Ticks::new(lifespan), Priority::new(priority)))
        .collect()
}

/// Drives the simulation for up to `max_ticks`, recording who ran each
/// tick
///
/// Each tick schedules, runs the winner for one tick, and retires it if
/// its lifespan is exhausted. Stops early once no process remains. An
/// entry of `None` is an idle tick (everything blocked, nothing admitted).
pub fn run_trace(sim: &mut Simulation, max_ticks: usize) -> Vec<Option<Pid>> {
    let mut trace = Vec::new();
    for _ in 0..max_ticks {
        if sim.live_count() == 0 {
            break;
        }
        let running = sim.schedule();
        trace.push(running);
        sim.advance_time(Ticks::new(1));
        if let Some(pid) = sim.current() {
            let finished = sim.process(pid).map_or(false, |p| p.is_finished());
            if finished {
                sim.retire_current();
            }
        }
    }
    trace
}
