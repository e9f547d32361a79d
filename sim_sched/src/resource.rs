//! Exclusive resources and arbitration
//!
//! Each resource has at most one owner and an ordered wait queue of
//! blocked requesters. `acquire` and `release` always act on behalf of the
//! current process; which waiter a release wakes is decided by the active
//! policy's arbitration strategy.
//!
//! Releasing wakes a waiter; it does not transfer ownership. The woken
//! process re-requests the resource when it next runs, so a third process
//! scheduled in between may still take the resource first.

use crate::audit::ScheduleEvent;
use crate::policy::PolicyKind;
use crate::process::ProcessStatus;
use crate::queue::{HandleQueue, ProcessHandle};
use crate::Simulation;
use core_types::{Priority, ResourceId};
use serde::{Deserialize, Serialize};

/// How `release` picks which blocked waiter to wake
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Arbitration {
    /// Earliest arrival wins
    Fcfs,
    /// Greatest effective priority wins; earliest arrival breaks ties
    Priority,
}

/// An exclusive resource slot in the fixed resource table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    id: ResourceId,
    owner: Option<ProcessHandle>,
    waiters: HandleQueue,
    ceiling: Option<Priority>,
}

impl Resource {
    pub(crate) fn new(id: ResourceId, ceiling: Option<Priority>) -> Self {
        Self {
            id,
            owner: None,
            waiters: HandleQueue::new(),
            ceiling,
        }
    }

    pub fn id(&self) -> ResourceId {
        self.id
    }

    pub fn owner(&self) -> Option<ProcessHandle> {
        self.owner
    }

    pub fn is_free(&self) -> bool {
        self.owner.is_none()
    }

    /// Static priority ceiling, when configured (PCP only)
    pub fn ceiling(&self) -> Option<Priority> {
        self.ceiling
    }

    pub fn waiter_count(&self) -> usize {
        self.waiters.len()
    }

    pub(crate) fn waiters(&self) -> &HandleQueue {
        &self.waiters
    }
}

impl Simulation {
    /// Attempts to acquire `rid` on behalf of the current process.
    ///
    /// Returns true when the resource was free and is now owned by the
    /// current process. Returns false after marking the current process
    /// Blocked and appending it to the resource's wait queue; the driver
    /// is expected to call [`Simulation::schedule`] again immediately.
    ///
    /// Calling with no current process, or with an unknown resource id, is
    /// an internal-consistency violation and aborts.
    pub fn acquire(&mut self, rid: ResourceId) -> bool {
        let requester = self
            .current
            .expect("acquire invoked with no current process");
        let index = self.resource_index(rid);

        let requester_status = self.processes.get(requester).status();
        assert!(
            requester_status == ProcessStatus::Running,
            "{} acquiring {} while {}",
            self.processes.get(requester).pid(),
            rid,
            requester_status,
        );

        if self.resources[index].owner.is_none() {
            self.resources[index].owner = Some(requester);
            if self.policy == PolicyKind::PriorityCeiling {
                self.raise_to_ceiling(requester, index);
            }
            let pid = self.processes.get(requester).pid();
            self.log.record(ScheduleEvent::Granted {
                pid,
                resource: rid,
                tick: self.now,
            });
            return true;
        }

        if self.policy == PolicyKind::PriorityInheritance {
            self.donate_priority(requester, index);
        }

        let process = self.processes.get_mut(requester);
        process.set_status(ProcessStatus::Blocked);
        let pid = process.pid();
        self.resources[index].waiters.push_back(requester);
        self.log.record(ScheduleEvent::Blocked {
            pid,
            resource: rid,
            tick: self.now,
        });
        false
    }

    /// Releases `rid`, which the current process must own.
    ///
    /// Clears ownership and wakes at most one blocked waiter per the
    /// active arbitration strategy: the earliest arrival under FCFS
    /// arbitration, the greatest effective priority (earliest arrival
    /// breaking ties) under priority arbitration. The winner becomes Ready
    /// at the ready-queue tail; every other waiter stays Blocked.
    ///
    /// Releasing a resource the current process does not own is an
    /// internal-consistency violation and aborts.
    pub fn release(&mut self, rid: ResourceId) {
        let releaser = self
            .current
            .expect("release invoked with no current process");
        let index = self.resource_index(rid);
        let pid = self.processes.get(releaser).pid();

        assert!(
            self.resources[index].owner == Some(releaser),
            "{} released {} without owning it",
            pid,
            rid,
        );
        self.resources[index].owner = None;

        match self.policy {
            PolicyKind::PriorityCeiling => self.refresh_ceiling(releaser),
            PolicyKind::PriorityInheritance => self.refresh_donation(releaser),
            _ => {}
        }

        self.log.record(ScheduleEvent::Released {
            pid,
            resource: rid,
            tick: self.now,
        });

        let winner = match self.policy.arbitration() {
            Arbitration::Fcfs => self.resources[index].waiters.pop_front(),
            Arbitration::Priority => {
                let winner = self.scan_highest_priority_waiter(index);
                if let Some(handle) = winner {
                    self.resources[index].waiters.remove(handle);
                }
                winner
            }
        };

        if let Some(handle) = winner {
            self.wake(handle, rid);
        }
    }

    /// Waiter with the strictly greatest effective priority; the first
    /// found wins ties, so an earlier arrival is never displaced by a
    /// later equal-priority waiter.
    fn scan_highest_priority_waiter(&self, index: usize) -> Option<ProcessHandle> {
        let mut winner: Option<ProcessHandle> = None;
        let mut best = Priority::new(i32::MIN);
        for handle in self.resources[index].waiters.iter() {
            let priority = self.processes.get(handle).effective_priority();
            if winner.is_none() || priority > best {
                winner = Some(handle);
                best = priority;
            }
        }
        winner
    }

    fn wake(&mut self, handle: ProcessHandle, rid: ResourceId) {
        let now = self.now;
        let process = self.processes.get_mut(handle);
        assert!(
            process.status() == ProcessStatus::Blocked,
            "{} woken from {} but is not blocked",
            process.pid(),
            rid,
        );
        process.set_status(ProcessStatus::Ready);
        process.set_queued_at(now);
        let pid = process.pid();
        self.ready.push_back(handle);
        self.log.record(ScheduleEvent::Woken {
            pid,
            resource: rid,
            tick: now,
        });
    }

    /// While owning ceiling-bearing resources, a process runs at least at
    /// the highest such ceiling.
    fn raise_to_ceiling(&mut self, owner: ProcessHandle, index: usize) {
        if let Some(ceiling) = self.resources[index].ceiling {
            let process = self.processes.get_mut(owner);
            if ceiling > process.effective_priority() {
                process.set_effective_priority(ceiling);
            }
        }
    }

    /// Recomputes the effective priority from the ceilings of the
    /// resources still owned, so a release drops exactly the boost the
    /// released resource contributed.
    fn refresh_ceiling(&mut self, handle: ProcessHandle) {
        let mut effective = self.processes.get(handle).base_priority();
        for resource in &self.resources {
            if resource.owner == Some(handle) {
                if let Some(ceiling) = resource.ceiling {
                    if ceiling > effective {
                        effective = ceiling;
                    }
                }
            }
        }
        self.processes.get_mut(handle).set_effective_priority(effective);
    }

    /// A blocked requester donates its effective priority to the owner
    /// when strictly greater. Donation depth is one: the boost is not
    /// propagated further if the owner is itself blocked.
    fn donate_priority(&mut self, requester: ProcessHandle, index: usize) {
        let donated = self.processes.get(requester).effective_priority();
        let owner = self.resources[index]
            .owner
            .expect("donation with no owner to donate to");
        let process = self.processes.get_mut(owner);
        if donated > process.effective_priority() {
            process.set_effective_priority(donated);
        }
    }

    /// Recomputes the effective priority from the waiters still blocked on
    /// resources the process owns; donations end with the contention that
    /// caused them.
    fn refresh_donation(&mut self, handle: ProcessHandle) {
        let mut effective = self.processes.get(handle).base_priority();
        for resource in &self.resources {
            if resource.owner == Some(handle) {
                for waiter in resource.waiters.iter() {
                    let donated = self.processes.get(waiter).effective_priority();
                    if donated > effective {
                        effective = donated;
                    }
                }
            }
        }
        self.processes.get_mut(handle).set_effective_priority(effective);
    }

    fn resource_index(&self, rid: ResourceId) -> usize {
        let index = rid.as_usize();
        assert!(
            index < self.resources.len(),
            "{} is outside the resource table",
            rid,
        );
        index
    }
}
