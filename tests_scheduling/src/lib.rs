//! Scheduling Test Utilities
//!
//! This crate provides the scripted-workload harness the integration tests
//! drive the scheduling engine with. The harness plays the role of the
//! external tick driver: it admits processes at their arrival ticks,
//! services due resource acquisitions and releases for whichever process
//! the engine selects, re-invokes `schedule()` whenever an acquisition
//! blocks, retires finished processes, and records who ran each tick.
//!
//! ## Test Philosophy
//!
//! - **Deterministic traces**: the same workload and policy always produce
//!   the same run trace, so traces are asserted verbatim.
//! - **Invariants always**: the queue-partition invariant is re-verified
//!   after every tick of every harness-driven test.
//! - **Scripts, not threads**: contention comes from scripted
//!   resource-holding spans, never from real concurrency.

use core_types::{Pid, Priority, ResourceId, Ticks};
use serde::{Deserialize, Serialize};
use sim_sched::{PolicyKind, SchedError, SimConfig, Simulation};
use std::collections::HashMap;

/// A span during which a process holds an exclusive resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSpan {
    pub resource: ResourceId,
    /// Age at which the process first requests the resource
    pub start_age: u64,
    /// CPU ticks the process runs while holding it before releasing
    pub duration: u64,
}

/// One scripted process
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkloadEntry {
    pub arrival: u64,
    pub lifespan: u64,
    pub priority: i32,
    pub spans: Vec<ResourceSpan>,
}

impl WorkloadEntry {
    pub fn new(arrival: u64, lifespan: u64, priority: i32) -> Self {
        Self {
            arrival,
            lifespan,
            priority,
            spans: Vec::new(),
        }
    }

    /// Adds a holding span: request `resource` at `start_age`, release
    /// after running `duration` ticks with it
    pub fn holding(mut self, resource: u32, start_age: u64, duration: u64) -> Self {
        self.spans.push(ResourceSpan {
            resource: ResourceId::new(resource),
            start_age,
            duration,
        });
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SpanState {
    Pending,
    Held,
    Done,
}

/// Drives a [`Simulation`] through a scripted workload one tick at a time
pub struct Workbench {
    sim: Simulation,
    entries: Vec<WorkloadEntry>,
    admitted: Vec<Option<Pid>>,
    scripts: HashMap<Pid, (Vec<ResourceSpan>, Vec<SpanState>)>,
    trace: Vec<Option<Pid>>,
    tick: u64,
}

impl Workbench {
    pub fn new(policy: PolicyKind, entries: Vec<WorkloadEntry>) -> Result<Self, SchedError> {
        Self::with_config(policy, SimConfig::default(), entries)
    }

    pub fn with_config(
        policy: PolicyKind,
        config: SimConfig,
        entries: Vec<WorkloadEntry>,
    ) -> Result<Self, SchedError> {
        let sim = Simulation::with_config(policy, config)?;
        let admitted = vec![None; entries.len()];
        Ok(Self {
            sim,
            entries,
            admitted,
            scripts: HashMap::new(),
            trace: Vec::new(),
            tick: 0,
        })
    }

    pub fn sim(&self) -> &Simulation {
        &self.sim
    }

    pub fn sim_mut(&mut self) -> &mut Simulation {
        &mut self.sim
    }

    /// Pid assigned to the `index`-th workload entry, once admitted
    pub fn pid_of(&self, index: usize) -> Option<Pid> {
        self.admitted.get(index).copied().flatten()
    }

    /// Who ran each tick so far; `None` entries are idle ticks
    pub fn trace(&self) -> &[Option<Pid>] {
        &self.trace
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// True once every entry has been admitted and has finished
    pub fn is_done(&self) -> bool {
        self.admitted.iter().all(|pid| pid.is_some()) && self.sim.live_count() == 0
    }

    /// Runs one tick; returns the pid that occupied the CPU
    pub fn step(&mut self) -> Option<Pid> {
        self.admit_arrivals();
        let running = self.dispatch();
        self.trace.push(running);
        self.sim.advance_time(Ticks::new(1));
        self.retire_finished();
        self.sim.check_invariants();
        self.tick += 1;
        running
    }

    /// Runs until the workload drains or `max_ticks` elapse, returning the
    /// full run trace
    pub fn run(&mut self, max_ticks: u64) -> &[Option<Pid>] {
        for _ in 0..max_ticks {
            if self.is_done() {
                break;
            }
            self.step();
        }
        &self.trace
    }

    fn admit_arrivals(&mut self) {
        for (index, entry) in self.entries.iter().enumerate() {
            if entry.arrival == self.tick && self.admitted[index].is_none() {
                let pid = self
                    .sim
                    .admit(Ticks::new(entry.lifespan), Priority::new(entry.priority))
                    .expect("workload entry failed admission");
                self.admitted[index] = Some(pid);
                self.scripts.insert(
                    pid,
                    (entry.spans.clone(), vec![SpanState::Pending; entry.spans.len()]),
                );
            }
        }
    }

    /// Picks who runs this tick. A candidate whose due acquisition fails
    /// is blocked by the engine, and the pick repeats until a candidate
    /// holds everything it needs or nothing is runnable.
    fn dispatch(&mut self) -> Option<Pid> {
        loop {
            let pid = self.sim.schedule()?;
            if self.service_spans(pid) {
                return Some(pid);
            }
        }
    }

    /// Services due releases and acquisitions for the selected process, in
    /// script order. Returns false when an acquisition blocked it.
    fn service_spans(&mut self, pid: Pid) -> bool {
        let age = self
            .sim
            .process(pid)
            .expect("scheduled process missing from arena")
            .age()
            .0;
        let Some((spans, states)) = self.scripts.get_mut(&pid) else {
            return true;
        };
        for (span, state) in spans.iter().zip(states.iter_mut()) {
            match *state {
                SpanState::Done => {}
                SpanState::Held => {
                    if age >= span.start_age + span.duration {
                        self.sim.release(span.resource);
                        *state = SpanState::Done;
                    }
                }
                SpanState::Pending => {
                    if age >= span.start_age {
                        if self.sim.acquire(span.resource) {
                            *state = SpanState::Held;
                        } else {
                            return false;
                        }
                    }
                }
            }
        }
        true
    }

    /// Retires the current process once its lifespan is exhausted,
    /// releasing anything it still holds first (a process cannot exit
    /// owning a resource).
    fn retire_finished(&mut self) {
        let Some(pid) = self.sim.current() else {
            return;
        };
        let finished = self.sim.process(pid).map_or(false, |p| p.is_finished());
        if !finished {
            return;
        }
        if let Some((spans, states)) = self.scripts.get_mut(&pid) {
            for (span, state) in spans.iter().zip(states.iter_mut()) {
                if *state == SpanState::Held {
                    self.sim.release(span.resource);
                    *state = SpanState::Done;
                }
            }
        }
        self.sim.retire_current();
        self.scripts.remove(&pid);
    }
}

/// Collects the pids of a trace's non-idle ticks as raw values, which
/// keeps trace assertions readable
pub fn ran(trace: &[Option<Pid>]) -> Vec<u32> {
    trace.iter().filter_map(|pid| pid.map(|p| p.as_u32())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entries_admit_at_their_arrival_tick() {
        let mut bench = Workbench::new(
            PolicyKind::Fcfs,
            vec![WorkloadEntry::new(0, 2, 0), WorkloadEntry::new(3, 1, 0)],
        )
        .unwrap();

        bench.step();
        assert!(bench.pid_of(0).is_some());
        assert!(bench.pid_of(1).is_none());

        bench.step();
        bench.step();
        bench.step();
        assert!(bench.pid_of(1).is_some());
    }

    #[test]
    fn test_run_drains_workload() {
        let mut bench = Workbench::new(
            PolicyKind::RoundRobin,
            vec![WorkloadEntry::new(0, 2, 0), WorkloadEntry::new(0, 2, 0)],
        )
        .unwrap();

        let trace = bench.run(100);
        assert_eq!(trace.len(), 4);
        assert!(bench.is_done());
    }

    #[test]
    fn test_holding_span_is_released_on_schedule() {
        let entries = vec![WorkloadEntry::new(0, 4, 0).holding(0, 0, 2)];
        let mut bench = Workbench::new(PolicyKind::Fcfs, entries).unwrap();

        bench.step();
        assert_eq!(
            bench.sim().resource_owner(ResourceId::new(0)),
            bench.pid_of(0)
        );

        bench.run(10);
        assert_eq!(bench.sim().resource_owner(ResourceId::new(0)), None);
        assert!(bench.is_done());
    }
}
