//! Integration tests for the MESI protocol.

use snoopsim::common::instruction::Instruction::{Other, Read, Write};
use snoopsim::common::instruction::Instruction;
use snoopsim::config::SystemConfig;
use snoopsim::protocols::{Mesi, MesiStatus};
use snoopsim::sim::Simulator;

fn run_mesi(traces: Vec<Vec<Instruction>>) -> Simulator<Mesi> {
    let mut simulator = Simulator::new(&SystemConfig::default(), traces);
    simulator.run();
    simulator
}

/// Tests that a read miss with no sharers fills Exclusive from memory
/// after the full miss penalty.
#[test]
fn test_read_miss_fills_exclusive() {
    let simulator = run_mesi(vec![vec![Read(0x1000)], vec![]]);
    assert_eq!(simulator.line_status(0, 0x1000), Some(MesiStatus::E));
    assert_eq!(simulator.stats().completion_cycle(0), Some(99));
    assert_eq!(simulator.stats().bus_traffic_words(), 8);
    assert_eq!(simulator.stats().idle_cycles(0), 99);
}

/// Tests a read miss resolved from memory followed by a cache-to-cache
/// read: both caches end Shared, with one block of traffic per miss.
#[test]
fn test_read_read_sharing() {
    let simulator = run_mesi(vec![vec![Read(0x1000)], vec![Other(200), Read(0x1000)]]);
    assert_eq!(simulator.line_status(0, 0x1000), Some(MesiStatus::S));
    assert_eq!(simulator.line_status(1, 0x1000), Some(MesiStatus::S));

    let stats = simulator.stats();
    assert_eq!(stats.completion_cycle(0), Some(99));
    // The cache-to-cache transfer streams the block at two cycles a word.
    assert_eq!(stats.completion_cycle(1), Some(215));
    assert_eq!(stats.write_backs(), 0);
    assert_eq!(stats.bus_traffic_words(), 16);
    assert_eq!(stats.bus_traffic_bytes(), 64);
}

/// Tests the silent Exclusive-to-Modified upgrade on a write hit.
#[test]
fn test_write_hit_exclusive_upgrades_silently() {
    let simulator = run_mesi(vec![vec![Read(0x1000), Write(0x1000)], vec![]]);
    assert_eq!(simulator.line_status(0, 0x1000), Some(MesiStatus::M));

    let stats = simulator.stats();
    assert_eq!(stats.write_hits(0), 1);
    assert_eq!(stats.write_hits_in_state(0, "E"), 1);
    assert_eq!(stats.completion_cycle(0), Some(100));
    // No additional traffic beyond the original fetch.
    assert_eq!(stats.bus_traffic_words(), 8);
}

/// Tests that a write hit on a Shared line invalidates the other sharer
/// and leaves no stale copies behind.
#[test]
fn test_write_invalidates_sharers() {
    let simulator = run_mesi(vec![
        vec![Read(0x1000), Other(100), Write(0x1000)],
        vec![Other(120), Read(0x1000)],
    ]);
    assert_eq!(simulator.line_status(0, 0x1000), Some(MesiStatus::M));
    assert_eq!(simulator.line_status(1, 0x1000), None);

    let stats = simulator.stats();
    assert_eq!(stats.invalidations(1), 1);
    assert_eq!(stats.invalidations(0), 0);
    assert_eq!(stats.write_hits_in_state(0, "S"), 1);
    assert_eq!(stats.completion_cycle(1), Some(135));
    assert_eq!(stats.completion_cycle(0), Some(215));
    // Fetch, cache-to-cache supply, and the upgrade each move one block.
    assert_eq!(stats.bus_traffic_words(), 24);
}

/// Tests that read hits retire in a single cycle each.
#[test]
fn test_read_hits_retire_quickly() {
    let simulator = run_mesi(vec![vec![Read(0x1000), Read(0x1000), Read(0x1000)], vec![]]);
    let stats = simulator.stats();
    assert_eq!(stats.read_hits(0), 2);
    assert_eq!(stats.read_hits_in_state(0, "E"), 2);
    assert_eq!(stats.completion_cycle(0), Some(101));
}

/// Tests that a write miss with no sharers fills Modified from memory.
#[test]
fn test_write_miss_fills_modified() {
    let simulator = run_mesi(vec![vec![Write(0x1000)], vec![]]);
    assert_eq!(simulator.line_status(0, 0x1000), Some(MesiStatus::M));
    assert_eq!(simulator.stats().completion_cycle(0), Some(99));
    assert_eq!(simulator.stats().bus_traffic_words(), 8);
}

/// Tests that a write miss steals a dirty block from its previous writer.
#[test]
fn test_write_miss_takes_dirty_block_cache_to_cache() {
    let simulator = run_mesi(vec![vec![Write(0x1000)], vec![Other(150), Write(0x1000)]]);
    assert_eq!(simulator.line_status(0, 0x1000), None);
    assert_eq!(simulator.line_status(1, 0x1000), Some(MesiStatus::M));

    let stats = simulator.stats();
    assert_eq!(stats.invalidations(0), 1);
    // Core 1's miss is served cache-to-cache in one block time.
    assert_eq!(stats.completion_cycle(1), Some(165));
}
