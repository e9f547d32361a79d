//! Scheduling policy catalog
//!
//! Each policy's `schedule()` is a pure decision over the current slot and
//! the ready queue: it returns the process to occupy the CPU for the next
//! tick, possibly the incumbent, possibly none. Side effects are limited
//! to queue membership and process status; nothing here performs I/O.
//!
//! The non-preemptive family (FCFS, SJF) keeps a runnable incumbent
//! unconditionally. The preemptive family (STCF, Round-Robin, the
//! priority policies) keeps it only while the ready queue is empty, then
//! lets the scan decide. A blocked incumbent is never re-queued, since it
//! already sits in a resource's wait queue.

use crate::audit::{PreemptionReason, ScheduleEvent};
use crate::process::ProcessStatus;
use crate::queue::ProcessHandle;
use crate::resource::Arbitration;
use crate::Simulation;
use core_types::{Pid, Priority, Ticks};
use serde::{Deserialize, Serialize};

/// Built-in scheduling policies
///
/// The first five are the core catalog; the remaining three are the
/// priority extensions. All priority-family members share priority
/// arbitration for resource hand-off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PolicyKind {
    /// Non-preemptive, strict arrival order
    Fcfs,
    /// Non-preemptive, minimum total lifespan
    Sjf,
    /// Preemptive SJF on remaining time
    Stcf,
    /// Preemptive, one-tick quantum rotation
    RoundRobin,
    /// Preemptive, greatest effective priority; equal priority rotates
    Priority,
    /// Priority whose waiters gain effective priority with ready-queue age
    PriorityAging,
    /// Priority with static per-resource ceilings raising owners
    PriorityCeiling,
    /// Priority with blocked waiters donating priority to owners
    PriorityInheritance,
}

impl PolicyKind {
    /// Every catalog entry, in presentation order
    pub const ALL: [PolicyKind; 8] = [
        PolicyKind::Fcfs,
        PolicyKind::Sjf,
        PolicyKind::Stcf,
        PolicyKind::RoundRobin,
        PolicyKind::Priority,
        PolicyKind::PriorityAging,
        PolicyKind::PriorityCeiling,
        PolicyKind::PriorityInheritance,
    ];

    /// Human-readable policy name
    pub fn name(&self) -> &'static str {
        match self {
            PolicyKind::Fcfs => "FCFS",
            PolicyKind::Sjf => "Shortest-Job First",
            PolicyKind::Stcf => "Shortest Time-to-Complete First",
            PolicyKind::RoundRobin => "Round-Robin",
            PolicyKind::Priority => "Priority",
            PolicyKind::PriorityAging => "Priority + aging",
            PolicyKind::PriorityCeiling => "Priority + PCP Protocol",
            PolicyKind::PriorityInheritance => "Priority + PIP Protocol",
        }
    }

    /// Arbitration strategy the policy pairs with for resource hand-off
    pub fn arbitration(&self) -> Arbitration {
        match self {
            PolicyKind::Fcfs | PolicyKind::Sjf | PolicyKind::Stcf | PolicyKind::RoundRobin => {
                Arbitration::Fcfs
            }
            PolicyKind::Priority
            | PolicyKind::PriorityAging
            | PolicyKind::PriorityCeiling
            | PolicyKind::PriorityInheritance => Arbitration::Priority,
        }
    }

    /// True for policies that may take the CPU away from a runnable process
    pub fn is_preemptive(&self) -> bool {
        !matches!(self, PolicyKind::Fcfs | PolicyKind::Sjf)
    }
}

impl Simulation {
    /// Per-policy setup hook. Idempotent; no built-in policy carries
    /// per-policy state, so this is a no-op that always succeeds.
    pub fn initialize(&mut self) -> Result<(), crate::SchedError> {
        Ok(())
    }

    /// Per-policy teardown hook. Idempotent no-op for every built-in
    /// policy.
    pub fn finalize(&mut self) {}

    /// Picks the process to occupy the CPU for the next tick.
    ///
    /// Returns None when no process is runnable (an idle tick, not an
    /// error). Selecting a process installs it in the current slot and
    /// marks it Running; an incumbent displaced while still runnable is
    /// re-queued at the ready-queue tail.
    pub fn schedule(&mut self) -> Option<Pid> {
        let next = match self.policy {
            PolicyKind::Fcfs => self.schedule_arrival_order(),
            PolicyKind::Sjf => self.schedule_shortest_lifespan(),
            PolicyKind::Stcf => self.schedule_shortest_remaining(),
            PolicyKind::RoundRobin => self.schedule_round_robin(),
            PolicyKind::Priority
            | PolicyKind::PriorityCeiling
            | PolicyKind::PriorityInheritance => self.schedule_highest_priority(),
            PolicyKind::PriorityAging => {
                self.refresh_aging();
                self.schedule_highest_priority()
            }
        };
        self.install(next)
    }

    /// The incumbent, when it may keep the CPU: present, not blocked, and
    /// with unfinished lifespan.
    fn runnable_incumbent(&self) -> Option<ProcessHandle> {
        self.current.filter(|&handle| {
            let process = self.processes.get(handle);
            process.status() == ProcessStatus::Running && !process.is_finished()
        })
    }

    /// Non-preemptive, strict arrival order. No comparison needed: the
    /// ready queue is already ordered by arrival.
    fn schedule_arrival_order(&mut self) -> Option<ProcessHandle> {
        if let Some(incumbent) = self.runnable_incumbent() {
            return Some(incumbent);
        }
        self.ready.pop_front()
    }

    /// Non-preemptive, minimum total lifespan. A newly arrived shorter job
    /// never preempts a running one.
    fn schedule_shortest_lifespan(&mut self) -> Option<ProcessHandle> {
        if let Some(incumbent) = self.runnable_incumbent() {
            return Some(incumbent);
        }

        let mut winner: Option<ProcessHandle> = None;
        let mut best = Ticks::new(u64::MAX);
        for handle in self.ready.iter() {
            let lifespan = self.processes.get(handle).lifespan();
            if winner.is_none() || lifespan < best {
                winner = Some(handle);
                best = lifespan;
            }
        }
        if let Some(handle) = winner {
            self.ready.remove(handle);
        }
        winner
    }

    /// Preemptive SJF on remaining time. The incumbent's remaining time is
    /// the bar to beat; an absent, blocked, or finished incumbent sets no
    /// bar at all.
    fn schedule_shortest_remaining(&mut self) -> Option<ProcessHandle> {
        let incumbent = self.runnable_incumbent();
        if incumbent.is_some() && self.ready.is_empty() {
            return incumbent;
        }

        let mut winner: Option<ProcessHandle> = None;
        let mut best: Option<Ticks> =
            incumbent.map(|handle| self.processes.get(handle).remaining());
        for handle in self.ready.iter() {
            let remaining = self.processes.get(handle).remaining();
            if best.map_or(true, |bar| remaining < bar) {
                winner = Some(handle);
                best = Some(remaining);
            }
        }

        match winner {
            None => incumbent,
            Some(handle) => {
                if let Some(displaced) = incumbent {
                    self.demote(displaced, PreemptionReason::ShorterRemaining);
                }
                self.ready.remove(handle);
                Some(handle)
            }
        }
    }

    /// Preemptive, one-tick quantum. The incumbent is re-queued after the
    /// head is taken, so the other waiters keep their relative order.
    fn schedule_round_robin(&mut self) -> Option<ProcessHandle> {
        let incumbent = self.runnable_incumbent();
        if incumbent.is_some() && self.ready.is_empty() {
            return incumbent;
        }

        match self.ready.pop_front() {
            None => incumbent,
            Some(next) => {
                if let Some(displaced) = incumbent {
                    self.demote(displaced, PreemptionReason::Rotation);
                }
                Some(next)
            }
        }
    }

    /// Preemptive, greatest effective priority. The incumbent keeps the
    /// CPU only with strictly higher priority than the best waiter; an
    /// equal-priority winner rotates the incumbent to the tail so peers
    /// interleave instead of one monopolizing the CPU.
    fn schedule_highest_priority(&mut self) -> Option<ProcessHandle> {
        let incumbent = self.runnable_incumbent();
        if incumbent.is_some() && self.ready.is_empty() {
            return incumbent;
        }

        let mut winner: Option<ProcessHandle> = None;
        let mut best = Priority::new(i32::MIN);
        for handle in self.ready.iter() {
            let priority = self.processes.get(handle).effective_priority();
            if winner.is_none() || priority > best {
                winner = Some(handle);
                best = priority;
            }
        }

        let winner = match winner {
            None => return incumbent,
            Some(handle) => handle,
        };
        if let Some(displaced) = incumbent {
            if self.processes.get(displaced).effective_priority() > best {
                return Some(displaced);
            }
            self.demote(displaced, PreemptionReason::Priority);
        }
        self.ready.remove(winner);
        Some(winner)
    }

    /// Recomputes ready processes' effective priorities from their
    /// ready-queue wait: one `aging_boost` step per full `aging_interval`
    /// waited. Blocked processes do not age.
    fn refresh_aging(&mut self) {
        let interval = self.config.aging_interval;
        let boost = self.config.aging_boost;
        let now = self.now;

        let waiting: Vec<ProcessHandle> = self.ready.iter().collect();
        for handle in waiting {
            let process = self.processes.get_mut(handle);
            let waited = now.saturating_sub(process.queued_at());
            let steps = (waited.0 / interval.0) as i64;
            let effective = process
                .base_priority()
                .saturating_add(steps.saturating_mul(boost as i64));
            process.set_effective_priority(effective);
        }
    }

    /// Re-queues a displaced incumbent at the ready-queue tail.
    fn demote(&mut self, handle: ProcessHandle, reason: PreemptionReason) {
        let now = self.now;
        let process = self.processes.get_mut(handle);
        process.set_status(ProcessStatus::Ready);
        process.set_queued_at(now);
        let pid = process.pid();
        self.ready.push_back(handle);
        self.log.record(ScheduleEvent::Preempted {
            pid,
            reason,
            tick: now,
        });
    }

    /// Installs the decision in the current slot.
    fn install(&mut self, next: Option<ProcessHandle>) -> Option<Pid> {
        match next {
            Some(handle) if Some(handle) == self.current => {
                Some(self.processes.get(handle).pid())
            }
            Some(handle) => {
                let now = self.now;
                let process = self.processes.get_mut(handle);
                process.set_status(ProcessStatus::Running);
                if self.policy == PolicyKind::PriorityAging {
                    // A dispatched process stops aging and reverts to base.
                    let base = process.base_priority();
                    process.set_effective_priority(base);
                }
                let pid = process.pid();
                self.current = Some(handle);
                self.log.record(ScheduleEvent::Selected { pid, tick: now });
                Some(pid)
            }
            None => {
                self.current = None;
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{admit_all, run_trace};
    use crate::Simulation;
    use core_types::ResourceId;

    fn pids(raw: &[u32]) -> Vec<Option<Pid>> {
        raw.iter().map(|&p| Some(Pid::new(p))).collect()
    }

    #[test]
    fn test_catalog_names() {
        assert_eq!(PolicyKind::Fcfs.name(), "FCFS");
        assert_eq!(PolicyKind::Sjf.name(), "Shortest-Job First");
        assert_eq!(PolicyKind::Stcf.name(), "Shortest Time-to-Complete First");
        assert_eq!(PolicyKind::RoundRobin.name(), "Round-Robin");
        assert_eq!(PolicyKind::Priority.name(), "Priority");
        assert_eq!(PolicyKind::PriorityAging.name(), "Priority + aging");
        assert_eq!(PolicyKind::PriorityCeiling.name(), "Priority + PCP Protocol");
        assert_eq!(
            PolicyKind::PriorityInheritance.name(),
            "Priority + PIP Protocol"
        );
    }

    #[test]
    fn test_catalog_arbitration_pairing() {
        for kind in PolicyKind::ALL {
            let expected = match kind {
                PolicyKind::Fcfs | PolicyKind::Sjf | PolicyKind::Stcf | PolicyKind::RoundRobin => {
                    Arbitration::Fcfs
                }
                _ => Arbitration::Priority,
            };
            assert_eq!(kind.arbitration(), expected, "{}", kind.name());
        }
    }

    #[test]
    fn test_only_fcfs_and_sjf_are_non_preemptive() {
        for kind in PolicyKind::ALL {
            let expected = !matches!(kind, PolicyKind::Fcfs | PolicyKind::Sjf);
            assert_eq!(kind.is_preemptive(), expected, "{}", kind.name());
        }
    }

    #[test]
    fn test_lifecycle_hooks_are_idempotent() {
        let mut sim = Simulation::new(PolicyKind::Fcfs);
        assert_eq!(sim.initialize(), Ok(()));
        assert_eq!(sim.initialize(), Ok(()));
        sim.finalize();
        sim.finalize();
    }

    #[test]
    fn test_schedule_with_nothing_ready_is_idle() {
        let mut sim = Simulation::new(PolicyKind::Fcfs);
        assert_eq!(sim.schedule(), None);
        assert_eq!(sim.current(), None);
    }

    #[test]
    fn test_fcfs_runs_to_completion_in_arrival_order() {
        let mut sim = Simulation::new(PolicyKind::Fcfs);
        admit_all(&mut sim, &[(2, 0), (1, 0)]).unwrap();

        let trace = run_trace(&mut sim, 10);
        assert_eq!(trace, pids(&[1, 1, 2]));
    }

    #[test]
    fn test_sjf_picks_shortest_total_lifespan() {
        let mut sim = Simulation::new(PolicyKind::Sjf);
        admit_all(&mut sim, &[(5, 0), (2, 0), (8, 0)]).unwrap();

        assert_eq!(sim.schedule(), Some(Pid::new(2)));
    }

    #[test]
    fn test_sjf_does_not_preempt_for_late_shorter_job() {
        let mut sim = Simulation::new(PolicyKind::Sjf);
        admit_all(&mut sim, &[(4, 0)]).unwrap();
        sim.schedule();
        sim.advance_time(Ticks::new(1));

        admit_all(&mut sim, &[(1, 0)]).unwrap();
        assert_eq!(sim.schedule(), Some(Pid::new(1)));
    }

    #[test]
    fn test_stcf_preempts_for_shorter_remaining() {
        let mut sim = Simulation::new(PolicyKind::Stcf);
        admit_all(&mut sim, &[(5, 0)]).unwrap();
        sim.schedule();
        sim.advance_time(Ticks::new(1));

        admit_all(&mut sim, &[(2, 0)]).unwrap();
        assert_eq!(sim.schedule(), Some(Pid::new(2)));
        // The displaced process waits at the ready-queue tail, not dropped.
        assert_eq!(sim.ready_count(), 1);
        assert_eq!(
            sim.process(Pid::new(1)).unwrap().status(),
            ProcessStatus::Ready
        );
    }

    #[test]
    fn test_stcf_keeps_incumbent_on_tie() {
        let mut sim = Simulation::new(PolicyKind::Stcf);
        admit_all(&mut sim, &[(4, 0)]).unwrap();
        sim.schedule();
        sim.advance_time(Ticks::new(1));

        // Remaining 3 vs. newly ready 3: no strict winner.
        admit_all(&mut sim, &[(3, 0)]).unwrap();
        assert_eq!(sim.schedule(), Some(Pid::new(1)));
    }

    #[test]
    fn test_round_robin_rotates_every_tick() {
        let mut sim = Simulation::new(PolicyKind::RoundRobin);
        admit_all(&mut sim, &[(3, 0), (3, 0), (3, 0)]).unwrap();

        let trace = run_trace(&mut sim, 12);
        assert_eq!(trace, pids(&[1, 2, 3, 1, 2, 3, 1, 2, 3]));
    }

    #[test]
    fn test_round_robin_sole_runnable_keeps_cpu() {
        let mut sim = Simulation::new(PolicyKind::RoundRobin);
        admit_all(&mut sim, &[(3, 0)]).unwrap();

        let trace = run_trace(&mut sim, 5);
        assert_eq!(trace, pids(&[1, 1, 1]));
        assert_eq!(
            sim.log()
                .count_events(|e| matches!(e, ScheduleEvent::Preempted { .. })),
            0
        );
    }

    #[test]
    fn test_priority_higher_wins_and_lower_waits() {
        let mut sim = Simulation::new(PolicyKind::Priority);
        admit_all(&mut sim, &[(2, 1), (2, 5)]).unwrap();

        let trace = run_trace(&mut sim, 6);
        assert_eq!(trace, pids(&[2, 2, 1, 1]));
    }

    #[test]
    fn test_priority_incumbent_with_strictly_higher_priority_keeps_cpu() {
        let mut sim = Simulation::new(PolicyKind::Priority);
        admit_all(&mut sim, &[(3, 5), (3, 3)]).unwrap();

        let trace = run_trace(&mut sim, 8);
        assert_eq!(trace, pids(&[1, 1, 1, 2, 2, 2]));
    }

    #[test]
    fn test_priority_equal_priority_rotates() {
        let mut sim = Simulation::new(PolicyKind::Priority);
        admit_all(&mut sim, &[(3, 5), (3, 5)]).unwrap();

        let trace = run_trace(&mut sim, 8);
        assert_eq!(trace, pids(&[1, 2, 1, 2, 1, 2]));
    }

    #[test]
    fn test_blocked_incumbent_is_not_requeued() {
        let mut sim = Simulation::new(PolicyKind::RoundRobin);
        admit_all(&mut sim, &[(3, 0), (3, 0), (3, 0)]).unwrap();

        sim.schedule();
        assert!(sim.acquire(ResourceId::new(0)));
        sim.advance_time(Ticks::new(1));
        sim.schedule();
        assert!(!sim.acquire(ResourceId::new(0)));

        // The blocked process must not reappear in the ready queue when
        // the next schedule replaces it.
        let blocked = sim.current().unwrap();
        sim.schedule();
        assert_ne!(sim.current(), Some(blocked));
        assert_eq!(
            sim.process(blocked).unwrap().status(),
            ProcessStatus::Blocked
        );
        sim.check_invariants();
    }

    #[test]
    fn test_aging_boosts_long_waiters() {
        let config = crate::SimConfig {
            aging_interval: Ticks::new(2),
            aging_boost: 1,
            ..Default::default()
        };
        let mut sim = Simulation::with_config(PolicyKind::PriorityAging, config).unwrap();
        admit_all(&mut sim, &[(10, 5), (2, 1)]).unwrap();

        // Eight ticks of queue wait lift the waiter to 1 + 4 = 5, tying
        // the incumbent; ties rotate, so it runs no later than tick 8.
        let trace = run_trace(&mut sim, 12);
        let first_low = trace.iter().position(|p| *p == Some(Pid::new(2)));
        assert!(first_low.is_some(), "aged process never ran: {:?}", trace);
        assert!(first_low.unwrap() < 10, "aging failed to bound starvation");
    }
}
