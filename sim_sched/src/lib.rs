//! # Simulated Scheduler
//!
//! Deterministic simulation of CPU scheduling under contention for shared,
//! mutually-exclusive resources.
//!
//! ## Purpose
//!
//! Given a population of processes with known lifespans and priorities,
//! the engine decides once per tick which process occupies the CPU, and
//! arbitrates ownership of a fixed set of exclusive resources among
//! blocked competitors. The tick loop itself belongs to an external
//! driver; the engine exposes the decision functions it invokes.
//!
//! ## Philosophy
//!
//! - **Determinism first**: same workload + same policy => same trace.
//! - **No hidden concurrency**: "Blocked" and "Running" are logical
//!   labels. Every operation runs to completion within a tick; nothing
//!   here touches OS threads.
//! - **Inspectable**: all state is accessible, and every decision lands
//!   in a serializable audit log.
//! - **Invariants are checkable**: a process handle lives in exactly one
//!   of the current slot, the ready queue, or one wait queue. Handles
//!   move between queues with remove-then-insert, never by aliasing, and
//!   [`Simulation::check_invariants`] verifies the partition on demand.
//!
//! ## Structure
//!
//! - [`Simulation`]: the context object holding the process arena, ready
//!   queue, resource table, current slot, and clock
//! - [`policy`]: the policy catalog and per-policy `schedule()` decisions
//! - [`resource`]: exclusive resources with FCFS and priority arbitration
//! - [`audit`]: the schedule event log

pub mod audit;
pub mod error;
pub mod policy;
pub mod process;
pub mod queue;
pub mod resource;
pub mod test_utils;

pub use audit::{PreemptionReason, ScheduleEvent, ScheduleLog};
pub use error::SchedError;
pub use policy::PolicyKind;
pub use process::{Process, ProcessStatus};
pub use queue::{HandleQueue, ProcessHandle};
pub use resource::{Arbitration, Resource};

use core_types::{Pid, Priority, ResourceId, Ticks};

/// Simulation configuration
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Number of exclusive resources in the fixed table
    pub nr_resources: usize,
    /// Ready-queue wait required per effective-priority step under
    /// Priority + aging
    pub aging_interval: Ticks,
    /// Priority steps granted per full interval waited
    pub aging_boost: i32,
    /// Static priority ceilings indexed by resource id, used by
    /// Priority + PCP Protocol. Empty means no resource carries a ceiling;
    /// otherwise the length must match `nr_resources`.
    pub ceilings: Vec<Option<Priority>>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            nr_resources: 32,
            aging_interval: Ticks::new(4),
            aging_boost: 1,
            ceilings: Vec::new(),
        }
    }
}

impl SimConfig {
    fn validate(&self) -> Result<(), SchedError> {
        if self.aging_interval.is_zero() {
            return Err(SchedError::InvalidConfig(
                "aging interval must be non-zero".into(),
            ));
        }
        if !self.ceilings.is_empty() && self.ceilings.len() != self.nr_resources {
            return Err(SchedError::InvalidConfig(format!(
                "{} ceilings configured for {} resources",
                self.ceilings.len(),
                self.nr_resources
            )));
        }
        Ok(())
    }
}

/// Process arena
///
/// Slots are never reused: a retired process leaves its slot vacant, so a
/// handle stays unambiguous for the simulation's lifetime. Dereferencing a
/// vacated slot is an internal-consistency violation.
#[derive(Debug, Default)]
struct ProcessTable {
    slots: Vec<Option<Process>>,
}

impl ProcessTable {
    fn insert(&mut self, process: Process) -> ProcessHandle {
        let handle = ProcessHandle(self.slots.len());
        self.slots.push(Some(process));
        handle
    }

    fn get(&self, handle: ProcessHandle) -> &Process {
        self.slots[handle.0]
            .as_ref()
            .expect("stale process handle dereferenced")
    }

    fn get_mut(&mut self, handle: ProcessHandle) -> &mut Process {
        self.slots[handle.0]
            .as_mut()
            .expect("stale process handle dereferenced")
    }

    fn remove(&mut self, handle: ProcessHandle) -> Process {
        self.slots[handle.0]
            .take()
            .expect("stale process handle removed twice")
    }

    fn iter(&self) -> impl Iterator<Item = (ProcessHandle, &Process)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_ref().map(|p| (ProcessHandle(index), p)))
    }

    fn live_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }
}

/// The simulation context
///
/// Owns everything the scheduling and arbitration decisions read and
/// write: the process arena, the ready queue, the resource table, the
/// current slot, and the clock. The external driver admits processes,
/// advances time, retires finished processes, and calls
/// [`Simulation::schedule`] / [`Simulation::acquire`] /
/// [`Simulation::release`] as its workload demands.
pub struct Simulation {
    config: SimConfig,
    policy: PolicyKind,
    processes: ProcessTable,
    ready: HandleQueue,
    resources: Vec<Resource>,
    current: Option<ProcessHandle>,
    now: Ticks,
    next_pid: u32,
    log: ScheduleLog,
}

impl Simulation {
    /// Creates a simulation with the default configuration
    pub fn new(policy: PolicyKind) -> Self {
        Self::with_config(policy, SimConfig::default())
            .expect("default configuration is always valid")
    }

    /// Creates a simulation with a custom configuration
    pub fn with_config(policy: PolicyKind, config: SimConfig) -> Result<Self, SchedError> {
        config.validate()?;
        let resources = (0..config.nr_resources)
            .map(|index| {
                let ceiling = config.ceilings.get(index).copied().flatten();
                Resource::new(ResourceId::new(index as u32), ceiling)
            })
            .collect();
        Ok(Self {
            config,
            policy,
            processes: ProcessTable::default(),
            ready: HandleQueue::new(),
            resources,
            current: None,
            now: Ticks::zero(),
            next_pid: 1,
            log: ScheduleLog::new(),
        })
    }

    /// Admits a new process in the Ready state at the ready-queue tail
    pub fn admit(&mut self, lifespan: Ticks, priority: Priority) -> Result<Pid, SchedError> {
        if lifespan.is_zero() {
            return Err(SchedError::ZeroLifespan);
        }
        let pid = Pid::new(self.next_pid);
        self.next_pid += 1;
        let handle = self
            .processes
            .insert(Process::new(pid, lifespan, priority, self.now));
        self.ready.push_back(handle);
        self.log.record(ScheduleEvent::Admitted {
            pid,
            tick: self.now,
        });
        Ok(pid)
    }

    /// Advances the clock, aging the current process by the same amount
    ///
    /// Call after `schedule()` has decided who runs the tick.
    pub fn advance_time(&mut self, delta: Ticks) {
        self.now = self.now.saturating_add(delta);
        if let Some(handle) = self.current {
            self.processes.get_mut(handle).run_for(delta);
        }
    }

    /// Retires the current process, which must have exhausted its lifespan
    ///
    /// The externally driven Finished transition: the process leaves the
    /// arena and the current slot empties. Retiring an unfinished process,
    /// or retiring with no current process, aborts.
    pub fn retire_current(&mut self) -> Pid {
        let handle = self
            .current
            .take()
            .expect("retire invoked with no current process");
        let process = self.processes.get_mut(handle);
        assert!(
            process.is_finished(),
            "{} retired with {} remaining",
            process.pid(),
            process.remaining(),
        );
        process.set_status(ProcessStatus::Finished);
        let pid = process.pid();
        self.log.record(ScheduleEvent::Retired {
            pid,
            tick: self.now,
        });
        self.processes.remove(handle);
        pid
    }

    /// Pid of the process occupying the current slot
    ///
    /// Between a failed `acquire` and the next `schedule()` this may be a
    /// Blocked process; at every other point it is Running.
    pub fn current(&self) -> Option<Pid> {
        self.current.map(|handle| self.processes.get(handle).pid())
    }

    /// Current simulated time
    pub fn now(&self) -> Ticks {
        self.now
    }

    /// Active scheduling policy
    pub fn policy(&self) -> PolicyKind {
        self.policy
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Number of processes awaiting CPU assignment
    pub fn ready_count(&self) -> usize {
        self.ready.len()
    }

    /// Number of processes still in the arena
    pub fn live_count(&self) -> usize {
        self.processes.live_count()
    }

    /// Snapshot of a live process
    pub fn process(&self, pid: Pid) -> Option<&Process> {
        self.processes
            .iter()
            .map(|(_, process)| process)
            .find(|process| process.pid() == pid)
    }

    /// All live processes, in arena order
    pub fn processes(&self) -> impl Iterator<Item = &Process> {
        self.processes.iter().map(|(_, process)| process)
    }

    /// Pid of the process owning `rid`, when any
    pub fn resource_owner(&self, rid: ResourceId) -> Option<Pid> {
        let resource = self.resource(rid)?;
        resource
            .owner()
            .map(|handle| self.processes.get(handle).pid())
    }

    /// The resource table entry for `rid`
    pub fn resource(&self, rid: ResourceId) -> Option<&Resource> {
        self.resources.get(rid.as_usize())
    }

    /// The schedule event log
    pub fn log(&self) -> &ScheduleLog {
        &self.log
    }

    pub fn clear_log(&mut self) {
        self.log.clear();
    }

    /// Verifies the queue-partition invariant, aborting on violation
    ///
    /// Every live process appears in exactly one of the current slot, the
    /// ready queue, or a single wait queue, with a status matching its
    /// location. A Blocked process may transiently occupy the current slot
    /// between a failed `acquire` and the next `schedule()`; it still
    /// counts only as a waiter. Resource owners must be live, and owners
    /// are unique per resource by construction.
    pub fn check_invariants(&self) {
        for (handle, process) in self.processes.iter() {
            let pid = process.pid();
            let in_ready = self.ready.iter().filter(|&h| h == handle).count();
            let in_waits: usize = self
                .resources
                .iter()
                .map(|r| r.waiters().iter().filter(|&h| h == handle).count())
                .sum();
            let is_current = self.current == Some(handle);

            match process.status() {
                ProcessStatus::Running => {
                    assert!(is_current, "{} running but not in the current slot", pid);
                    assert!(
                        in_ready == 0 && in_waits == 0,
                        "{} running but also queued",
                        pid,
                    );
                }
                ProcessStatus::Ready => {
                    assert!(
                        in_ready == 1 && in_waits == 0 && !is_current,
                        "{} ready but not exactly once in the ready queue",
                        pid,
                    );
                }
                ProcessStatus::Blocked => {
                    assert!(
                        in_ready == 0 && in_waits == 1,
                        "{} blocked but not exactly once in a wait queue",
                        pid,
                    );
                }
                ProcessStatus::Finished => {
                    assert!(
                        in_ready == 0 && in_waits == 0 && !is_current,
                        "{} finished but still referenced",
                        pid,
                    );
                }
            }
        }

        for resource in &self.resources {
            if let Some(owner) = resource.owner() {
                // Panics if the owner's slot was vacated.
                let _ = self.processes.get(owner);
            }
            for waiter in resource.waiters().iter() {
                assert!(
                    self.processes.get(waiter).status() == ProcessStatus::Blocked,
                    "waiter on {} is not blocked",
                    resource.id(),
                );
            }
        }
    }
}
