//! Integration tests for the Dragon update protocol.

use snoopsim::common::instruction::Instruction::{Other, Read, Write};
use snoopsim::common::instruction::Instruction;
use snoopsim::config::SystemConfig;
use snoopsim::protocols::{Dragon, DragonStatus};
use snoopsim::sim::Simulator;

fn run_dragon(traces: Vec<Vec<Instruction>>) -> Simulator<Dragon> {
    let mut simulator = Simulator::new(&SystemConfig::default(), traces);
    simulator.run();
    simulator
}

/// Tests that a lone read miss fills Exclusive from memory.
#[test]
fn test_read_miss_unshared_fills_exclusive() {
    let simulator = run_dragon(vec![vec![Read(0x2000)], vec![]]);
    assert_eq!(simulator.line_status(0, 0x2000), Some(DragonStatus::E));
    assert_eq!(simulator.stats().completion_cycle(0), Some(99));
}

/// Tests that a reader joining a shared block lands in SharedClean.
#[test]
fn test_read_miss_shared_fills_shared_clean() {
    let simulator = run_dragon(vec![vec![Read(0x2000)], vec![Other(150), Read(0x2000)]]);
    assert_eq!(simulator.line_status(0, 0x2000), Some(DragonStatus::Sc));
    assert_eq!(simulator.line_status(1, 0x2000), Some(DragonStatus::Sc));
    assert_eq!(simulator.stats().completion_cycle(1), Some(165));
}

/// Tests that writes to a shared line broadcast single-word updates
/// instead of invalidating: the writer holds Sm, the sharer stays Sc, and
/// each write moves exactly one word.
#[test]
fn test_write_hit_updates_sharers() {
    let simulator = run_dragon(vec![
        vec![
            Read(0x2000),
            Other(100),
            Write(0x2000),
            Write(0x2000),
            Write(0x2000),
        ],
        vec![Other(120), Read(0x2000)],
    ]);
    assert_eq!(simulator.line_status(0, 0x2000), Some(DragonStatus::Sm));
    assert_eq!(simulator.line_status(1, 0x2000), Some(DragonStatus::Sc));

    let stats = simulator.stats();
    // Two block fetches plus one word per write.
    assert_eq!(stats.bus_traffic_words(), 8 + 8 + 3);
    assert_eq!(stats.invalidations(1), 3);
    assert_eq!(stats.invalidations(0), 0);
    assert_eq!(stats.write_backs(), 0);
    assert_eq!(stats.completion_cycle(0), Some(205));
    assert_eq!(stats.completion_cycle(1), Some(135));
}

/// Tests that an unshared write miss fetches from memory and lands in
/// Modified without any update traffic.
#[test]
fn test_write_miss_unshared_goes_to_memory() {
    let simulator = run_dragon(vec![vec![Write(0x2000)], vec![]]);
    assert_eq!(simulator.line_status(0, 0x2000), Some(DragonStatus::M));
    assert_eq!(simulator.stats().completion_cycle(0), Some(99));
    assert_eq!(simulator.stats().bus_traffic_words(), 8);
}

/// Tests the two-phase shared write miss: the sharing probe fetches the
/// block cache-to-cache, then a single-word update follows.
#[test]
fn test_write_miss_shared_probes_then_updates() {
    let simulator = run_dragon(vec![vec![Other(150), Write(0x2000)], vec![Read(0x2000)]]);
    assert_eq!(simulator.line_status(0, 0x2000), Some(DragonStatus::Sm));
    assert_eq!(simulator.line_status(1, 0x2000), Some(DragonStatus::Sc));

    let stats = simulator.stats();
    // Core 1's fetch, the probe's block supply, and one update word.
    assert_eq!(stats.bus_traffic_words(), 8 + 8 + 1);
    assert_eq!(stats.invalidations(1), 1);
    assert_eq!(stats.completion_cycle(0), Some(166));
}

/// Tests that updates never invalidate: the sharer's line stays readable
/// and the writer's copy survives as well.
#[test]
fn test_updates_leave_no_invalid_lines() {
    let simulator = run_dragon(vec![
        vec![Read(0x2000), Other(100), Write(0x2000)],
        vec![Other(120), Read(0x2000), Other(200), Read(0x2000)],
    ]);
    assert_eq!(simulator.line_status(0, 0x2000), Some(DragonStatus::Sm));
    assert_eq!(simulator.line_status(1, 0x2000), Some(DragonStatus::Sc));
    // The second read on core 1 is a hit on the updated line.
    assert_eq!(simulator.stats().read_hits(1), 1);
    assert_eq!(simulator.stats().read_hits_in_state(1, "Sc"), 1);
}
