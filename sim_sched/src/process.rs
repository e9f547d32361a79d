//! Simulated processes

use core_types::{Pid, Priority, Ticks};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a simulated process
///
/// These are logical labels, not OS-level thread states. A `Blocked`
/// process sits in exactly one resource's wait queue; a `Ready` process
/// sits in the ready queue; a `Running` process occupies the current slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessStatus {
    /// Eligible for CPU assignment, parked in the ready queue
    Ready,
    /// Occupying the CPU (the simulation's current slot)
    Running,
    /// Waiting in a resource's wait queue until a release wakes it
    Blocked,
    /// Lifespan exhausted; the driver retires the process
    Finished,
}

impl fmt::Display for ProcessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessStatus::Ready => write!(f, "READY"),
            ProcessStatus::Running => write!(f, "RUNNING"),
            ProcessStatus::Blocked => write!(f, "BLOCKED"),
            ProcessStatus::Finished => write!(f, "FINISHED"),
        }
    }
}

/// A simulated process
///
/// `base_priority` is fixed at admission. `effective_priority` is what the
/// priority-family policies and priority arbitration actually compare; the
/// aging, ceiling, and inheritance extensions raise and restore it, and it
/// equals the base under every other policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Process {
    pid: Pid,
    status: ProcessStatus,
    age: Ticks,
    lifespan: Ticks,
    base_priority: Priority,
    effective_priority: Priority,
    queued_at: Ticks,
}

impl Process {
    pub(crate) fn new(pid: Pid, lifespan: Ticks, priority: Priority, now: Ticks) -> Self {
        Self {
            pid,
            status: ProcessStatus::Ready,
            age: Ticks::zero(),
            lifespan,
            base_priority: priority,
            effective_priority: priority,
            queued_at: now,
        }
    }

    pub fn pid(&self) -> Pid {
        self.pid
    }

    pub fn status(&self) -> ProcessStatus {
        self.status
    }

    /// CPU ticks consumed so far
    pub fn age(&self) -> Ticks {
        self.age
    }

    /// Total CPU ticks the process requires
    pub fn lifespan(&self) -> Ticks {
        self.lifespan
    }

    pub fn base_priority(&self) -> Priority {
        self.base_priority
    }

    pub fn effective_priority(&self) -> Priority {
        self.effective_priority
    }

    /// Tick at which the process last entered the ready queue
    pub fn queued_at(&self) -> Ticks {
        self.queued_at
    }

    /// CPU ticks still required
    pub fn remaining(&self) -> Ticks {
        self.lifespan.saturating_sub(self.age)
    }

    pub fn is_finished(&self) -> bool {
        self.age >= self.lifespan
    }

    pub(crate) fn set_status(&mut self, status: ProcessStatus) {
        self.status = status;
    }

    pub(crate) fn run_for(&mut self, delta: Ticks) {
        self.age = self.age.saturating_add(delta);
    }

    pub(crate) fn set_effective_priority(&mut self, priority: Priority) {
        self.effective_priority = priority;
    }

    pub(crate) fn set_queued_at(&mut self, now: Ticks) {
        self.queued_at = now;
    }
}
