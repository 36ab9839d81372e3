//! Integration tests for the MOESI protocol.

use snoopsim::common::instruction::Instruction::{Other, Read, Write};
use snoopsim::common::instruction::Instruction;
use snoopsim::config::SystemConfig;
use snoopsim::protocols::{Moesi, MoesiStatus};
use snoopsim::sim::Simulator;

fn run_moesi(traces: Vec<Vec<Instruction>>) -> Simulator<Moesi> {
    let mut simulator = Simulator::new(&SystemConfig::default(), traces);
    simulator.run();
    simulator
}

/// Tests that a snooped read downgrades the writer to Owned and the dirty
/// block is supplied cache-to-cache with no memory write-back.
#[test]
fn test_owner_supplies_dirty_block() {
    let simulator = run_moesi(vec![vec![Write(0x3000)], vec![Other(150), Read(0x3000)]]);
    assert_eq!(simulator.line_status(0, 0x3000), Some(MoesiStatus::O));
    assert_eq!(simulator.line_status(1, 0x3000), Some(MoesiStatus::S));

    let stats = simulator.stats();
    assert_eq!(stats.write_backs(), 0);
    assert_eq!(stats.completion_cycle(1), Some(165));
}

/// Tests the owner keeps supplying later readers while non-owner sharers
/// pay the daisy-chain surcharge. Three cores: writer, then two readers.
#[test]
fn test_owner_keeps_supplying_later_readers() {
    let simulator = run_moesi(vec![
        vec![Write(0x3000)],
        vec![Other(150), Read(0x3000)],
        vec![Other(300), Read(0x3000)],
    ]);
    assert_eq!(simulator.line_status(0, 0x3000), Some(MoesiStatus::O));
    assert_eq!(simulator.line_status(1, 0x3000), Some(MoesiStatus::S));
    assert_eq!(simulator.line_status(2, 0x3000), Some(MoesiStatus::S));

    let stats = simulator.stats();
    assert_eq!(stats.write_backs(), 0);
    // One memory fetch plus two cache-to-cache supplies.
    assert_eq!(stats.bus_traffic_words(), 24);
    // The slowest supplier is the plain sharer: a block time plus the
    // daisy-chained arbitration of num_cores + 1 cycles.
    assert_eq!(stats.completion_cycle(2), Some(319));
}

/// Tests that a write hit on a shared line invalidates through a
/// dataless, single-cycle BusInvalidate.
#[test]
fn test_write_hit_shared_invalidate_is_dataless() {
    let simulator = run_moesi(vec![
        vec![Read(0x3000), Other(100), Write(0x3000)],
        vec![Other(120), Read(0x3000)],
    ]);
    assert_eq!(simulator.line_status(0, 0x3000), Some(MoesiStatus::M));
    assert_eq!(simulator.line_status(1, 0x3000), None);

    let stats = simulator.stats();
    assert_eq!(stats.invalidations(1), 1);
    // The invalidation itself moves no words.
    assert_eq!(stats.bus_traffic_words(), 16);
    // It also completes in the same cycle it is issued.
    assert_eq!(stats.completion_cycle(0), Some(200));
}

/// Tests that an owner writing again invalidates the sharers and reclaims
/// Modified.
#[test]
fn test_owner_write_reclaims_modified() {
    let simulator = run_moesi(vec![
        vec![Write(0x3000), Other(100), Write(0x3000)],
        vec![Other(150), Read(0x3000)],
    ]);
    assert_eq!(simulator.line_status(0, 0x3000), Some(MoesiStatus::M));
    assert_eq!(simulator.line_status(1, 0x3000), None);
    assert_eq!(simulator.stats().invalidations(1), 1);
    assert_eq!(simulator.stats().write_backs(), 0);
}

/// Tests that a read miss with no sharers fills Exclusive.
#[test]
fn test_read_miss_unshared_fills_exclusive() {
    let simulator = run_moesi(vec![vec![Read(0x3000)], vec![]]);
    assert_eq!(simulator.line_status(0, 0x3000), Some(MoesiStatus::E));
    assert_eq!(simulator.stats().completion_cycle(0), Some(99));
}
