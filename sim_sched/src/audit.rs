//! Scheduling audit log
//!
//! Deterministic, test-visible record of every scheduling and arbitration
//! decision. Entries are serializable so traces can be snapshotted and
//! compared across runs. The log never influences scheduling itself.

use core_types::{Pid, ResourceId, Ticks};
use serde::{Deserialize, Serialize};

/// Why a running process lost the CPU
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PreemptionReason {
    /// A waiter with strictly smaller remaining time won the scan
    ShorterRemaining,
    /// One-tick round-robin quantum rotation
    Rotation,
    /// A ready process with equal or higher effective priority won
    Priority,
}

/// Scheduling event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScheduleEvent {
    /// Process entered the simulation in the Ready state
    Admitted { pid: Pid, tick: Ticks },
    /// Process was installed in the current slot
    Selected { pid: Pid, tick: Ticks },
    /// Running process was displaced and re-queued
    Preempted {
        pid: Pid,
        reason: PreemptionReason,
        tick: Ticks,
    },
    /// Acquire failed; the process moved to the resource's wait queue
    Blocked {
        pid: Pid,
        resource: ResourceId,
        tick: Ticks,
    },
    /// Acquire succeeded; the process owns the resource
    Granted {
        pid: Pid,
        resource: ResourceId,
        tick: Ticks,
    },
    /// Owner released the resource
    Released {
        pid: Pid,
        resource: ResourceId,
        tick: Ticks,
    },
    /// A blocked waiter was woken and moved to the ready-queue tail
    Woken {
        pid: Pid,
        resource: ResourceId,
        tick: Ticks,
    },
    /// Finished process left the simulation
    Retired { pid: Pid, tick: Ticks },
}

/// Append-only log of schedule events
///
/// Queryable in tests to verify scheduling behavior.
#[derive(Debug, Default)]
pub struct ScheduleLog {
    entries: Vec<ScheduleEvent>,
}

impl ScheduleLog {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn record(&mut self, event: ScheduleEvent) {
        self.entries.push(event);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[ScheduleEvent] {
        &self.entries
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// True if any entry matches the predicate
    pub fn has_event<F>(&self, predicate: F) -> bool
    where
        F: Fn(&ScheduleEvent) -> bool,
    {
        self.entries.iter().any(predicate)
    }

    /// Number of entries matching the predicate
    pub fn count_events<F>(&self, predicate: F) -> usize
    where
        F: Fn(&ScheduleEvent) -> bool,
    {
        self.entries.iter().filter(|e| predicate(e)).count()
    }
}
