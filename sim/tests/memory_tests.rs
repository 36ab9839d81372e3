//! Integration tests for the memory controller and write buffer.

use snoopsim::soc::memory::{MemoryController, WriteBuffer};
use snoopsim::stats::StatisticsAccumulator;

/// Tests that a block fetch takes the full miss penalty.
#[test]
fn test_read_data_timing() {
    let mut stats = StatisticsAccumulator::new(1);
    let mut memory = MemoryController::new(100);

    assert!(!memory.read_data(0x1000));
    for _ in 0..98 {
        memory.run_once(&mut stats);
        assert!(!memory.read_data(0x1000));
    }
    memory.run_once(&mut stats);
    assert!(memory.read_data(0x1000));
}

/// Tests that a completed read clears the timer for the next fetch.
#[test]
fn test_read_data_timer_resets() {
    let mut stats = StatisticsAccumulator::new(1);
    let mut memory = MemoryController::new(2);

    assert!(!memory.read_data(0x1000));
    memory.run_once(&mut stats);
    assert!(memory.read_data(0x1000));

    assert!(!memory.read_data(0x2000));
    memory.run_once(&mut stats);
    assert!(memory.read_data(0x2000));
}

/// Tests that a simple-mode write-back takes the full penalty and is
/// recorded on completion.
#[test]
fn test_write_back_timing_and_accounting() {
    let mut stats = StatisticsAccumulator::new(1);
    let mut memory = MemoryController::new(100);

    assert!(!memory.write_back(0x1000, &mut stats));
    for _ in 0..99 {
        memory.run_once(&mut stats);
    }
    assert!(memory.write_back(0x1000, &mut stats));
    assert_eq!(stats.write_backs(), 1);
    assert!(memory.is_done());
}

/// Tests that the write buffer accepts an eviction immediately and drains
/// it in the background.
#[test]
fn test_write_buffer_accepts_and_drains() {
    let mut stats = StatisticsAccumulator::new(1);
    let mut memory = MemoryController::with_write_buffer(100, Some(8));

    assert!(memory.write_back(0x1000, &mut stats));
    assert!(!memory.is_done());

    for _ in 0..99 {
        memory.run_once(&mut stats);
    }
    assert_eq!(stats.write_backs(), 0);
    memory.run_once(&mut stats);
    assert_eq!(stats.write_backs(), 1);
    assert!(memory.is_done());
}

/// Tests that a read of a buffered address absorbs the write-back and
/// completes with the short coalescing delay.
#[test]
fn test_read_coalesces_with_buffered_write_back() {
    let mut stats = StatisticsAccumulator::new(1);
    let mut memory = MemoryController::with_write_buffer(100, None);
    memory.set_delay(16);

    assert!(memory.write_back(0x1000, &mut stats));
    assert!(!memory.read_data(0x1000));
    for _ in 0..15 {
        memory.run_once(&mut stats);
    }
    assert!(memory.read_data(0x1000));

    // The absorbed entry never reaches memory.
    assert!(memory.is_done());
    assert_eq!(stats.write_backs(), 0);
}

/// Tests that a read of an unbuffered address still pays the full penalty.
#[test]
fn test_read_misses_buffer_pays_full_penalty() {
    let mut stats = StatisticsAccumulator::new(1);
    let mut memory = MemoryController::with_write_buffer(100, None);
    memory.set_delay(16);

    assert!(memory.write_back(0x1000, &mut stats));
    assert!(!memory.read_data(0x2000));
    for _ in 0..98 {
        memory.run_once(&mut stats);
        assert!(!memory.read_data(0x2000));
    }
    memory.run_once(&mut stats);
    assert!(memory.read_data(0x2000));
}

/// Tests that a bounded buffer refuses evictions when full.
#[test]
fn test_write_buffer_capacity_bound() {
    let mut stats = StatisticsAccumulator::new(1);
    let mut memory = MemoryController::with_write_buffer(100, Some(1));

    assert!(memory.write_back(0x1000, &mut stats));
    assert!(!memory.write_back(0x2000, &mut stats));
}

/// Tests the write buffer FIFO in isolation.
#[test]
fn test_write_buffer_fifo() {
    let mut buffer = WriteBuffer::new(Some(2));
    assert!(buffer.push(0x1000, 3));
    assert!(buffer.push(0x2000, 3));
    assert!(!buffer.push(0x3000, 3));
    assert_eq!(buffer.len(), 2);

    assert!(buffer.remove_if_present(0x1000));
    assert!(!buffer.remove_if_present(0x1000));
    assert_eq!(buffer.len(), 1);

    // The remaining head drains after its three ticks.
    assert!(!buffer.run_once());
    assert!(!buffer.run_once());
    assert!(buffer.run_once());
    assert!(buffer.is_empty());
}
