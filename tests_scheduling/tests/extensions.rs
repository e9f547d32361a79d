//! Priority extension policies
//!
//! Aging bounds starvation, the ceiling protocol raises owners for the
//! holding duration, and inheritance lets blocked waiters donate priority
//! to the owner that stands in their way.

use core_types::{Priority, Ticks};
use sim_sched::{PolicyKind, ProcessStatus, SimConfig};
use tests_scheduling::{ran, Workbench, WorkloadEntry};

#[test]
fn test_plain_priority_starves_the_low_waiter() {
    let entries = vec![WorkloadEntry::new(0, 20, 9), WorkloadEntry::new(0, 2, 1)];
    let mut bench = Workbench::new(PolicyKind::Priority, entries).unwrap();

    let trace = ran(bench.run(40));
    let first_low = trace.iter().position(|&pid| pid == 2).unwrap();
    assert_eq!(first_low, 20, "the low-priority process must wait out the monopolist");
}

#[test]
fn test_aging_bounds_starvation() {
    let config = SimConfig {
        aging_interval: Ticks::new(2),
        aging_boost: 1,
        ..Default::default()
    };
    let entries = vec![WorkloadEntry::new(0, 20, 9), WorkloadEntry::new(0, 2, 1)];
    let mut bench = Workbench::with_config(PolicyKind::PriorityAging, config, entries).unwrap();

    let trace = ran(bench.run(40));
    let first_low = trace.iter().position(|&pid| pid == 2).unwrap();
    // Sixteen ticks of queue wait lift priority 1 to 9; the tie rotates
    // the monopolist out, well before its 20-tick lifespan ends.
    assert_eq!(first_low, 16);
    assert!(bench.is_done());
}

#[test]
fn test_pcp_raises_owner_to_ceiling_while_holding() {
    let config = SimConfig {
        nr_resources: 2,
        ceilings: vec![Some(Priority::new(9)), None],
        ..Default::default()
    };
    let entries = vec![WorkloadEntry::new(0, 6, 2).holding(0, 0, 3)];
    let mut bench = Workbench::with_config(PolicyKind::PriorityCeiling, config, entries).unwrap();

    bench.step();
    let owner = bench.pid_of(0).unwrap();
    assert_eq!(
        bench.sim().process(owner).unwrap().effective_priority(),
        Priority::new(9)
    );
    assert_eq!(
        bench.sim().process(owner).unwrap().base_priority(),
        Priority::new(2)
    );

    // The release at age 3 drops the boost the ceiling contributed.
    bench.step();
    bench.step();
    bench.step();
    assert_eq!(
        bench.sim().process(owner).unwrap().effective_priority(),
        Priority::new(2)
    );
}

#[test]
fn test_pcp_owner_resists_preemption_below_the_ceiling() {
    let config = SimConfig {
        nr_resources: 1,
        ceilings: vec![Some(Priority::new(9))],
        ..Default::default()
    };
    let entries = vec![
        WorkloadEntry::new(0, 4, 2).holding(0, 0, 3),
        WorkloadEntry::new(1, 2, 5),
    ];
    let mut bench = Workbench::with_config(PolicyKind::PriorityCeiling, config, entries).unwrap();

    let trace = ran(bench.run(20));
    // At the ceiling the owner outranks the priority-5 arrival for the
    // whole hold, so no inversion window opens mid-hold.
    assert_eq!(trace, vec![1, 1, 1, 1, 2, 2]);
}

#[test]
fn test_pip_blocked_waiter_donates_priority() {
    let entries = vec![
        WorkloadEntry::new(0, 6, 2).holding(0, 0, 4),
        WorkloadEntry::new(1, 2, 8).holding(0, 0, 1),
        WorkloadEntry::new(1, 3, 5),
    ];
    let mut bench = Workbench::new(PolicyKind::PriorityInheritance, entries).unwrap();

    bench.step();
    bench.step();
    let holder = bench.pid_of(0).unwrap();
    let waiter = bench.pid_of(1).unwrap();

    // The priority-8 process blocked on the held resource and donated its
    // priority, so the mid-priority process cannot wedge in between.
    assert_eq!(
        bench.sim().process(waiter).unwrap().status(),
        ProcessStatus::Blocked
    );
    assert_eq!(
        bench.sim().process(holder).unwrap().effective_priority(),
        Priority::new(8)
    );

    // The donation ends with the release.
    for _ in 0..3 {
        bench.step();
    }
    assert_eq!(
        bench.sim().process(holder).unwrap().effective_priority(),
        Priority::new(2)
    );

    let trace = ran(bench.run(30));
    assert!(bench.is_done());
    // The mid-priority process only runs after the donated-priority hold
    // ends and the priority-8 process has had its turn.
    let first_mid = trace.iter().position(|&pid| pid == 3).unwrap();
    let last_high = trace.iter().rposition(|&pid| pid == 2).unwrap();
    assert!(first_mid > last_high, "trace: {:?}", trace);
}
