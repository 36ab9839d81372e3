//! Integration tests for configuration validation.

use snoopsim::config::{CacheGeometry, MemoryConfig, SimConfig, SystemConfig};

/// Tests that the default geometry matches the documented defaults.
#[test]
fn test_default_geometry() {
    let geometry = CacheGeometry::default();
    assert_eq!(geometry.cache_size, 4096);
    assert_eq!(geometry.associativity, 2);
    assert_eq!(geometry.block_size, 32);
    assert_eq!(geometry.num_sets(), 64);
    assert_eq!(geometry.offset_bits(), 5);
    assert_eq!(geometry.set_index_bits(), 6);
    assert_eq!(geometry.words_per_block(), 8);
}

/// Tests that invalid geometries are rejected.
#[test]
fn test_invalid_geometry_is_rejected() {
    assert!(CacheGeometry::new(4096, 2, 32).is_ok());
    // Cache not divisible into sets.
    assert!(CacheGeometry::new(4096, 3, 32).is_err());
    // Block size not a power of two.
    assert!(CacheGeometry::new(4096, 2, 24).is_err());
    // Block smaller than a word.
    assert!(CacheGeometry::new(4096, 2, 2).is_err());
    // Empty cache.
    assert!(CacheGeometry::new(0, 2, 32).is_err());
    // Sets not a power of two (96 sets).
    assert!(CacheGeometry::new(6144, 2, 32).is_err());
}

/// Tests that a fully associative single-set cache is accepted.
#[test]
fn test_single_set_geometry() {
    let geometry = CacheGeometry::new(256, 8, 32).unwrap();
    assert_eq!(geometry.num_sets(), 1);
    assert_eq!(geometry.set_index_bits(), 0);
}

/// Tests the memory defaults and the unbounded capacity spelling.
#[test]
fn test_memory_defaults() {
    let memory = MemoryConfig::default();
    assert_eq!(memory.miss_penalty, 100);
    assert!(!memory.write_buffer);
    assert_eq!(memory.capacity(), Some(8));

    let unbounded = MemoryConfig {
        write_buffer_capacity: -1,
        ..MemoryConfig::default()
    };
    assert_eq!(unbounded.capacity(), None);
}

/// Tests that a zero core count or a zero miss penalty is rejected.
#[test]
fn test_system_config_validation() {
    let geometry = CacheGeometry::default();
    assert!(SystemConfig::new(geometry, 0, SimConfig::default()).is_err());

    let mut file = SimConfig::default();
    file.memory.miss_penalty = 0;
    assert!(SystemConfig::new(geometry, 2, file).is_err());

    assert!(SystemConfig::new(geometry, 2, SimConfig::default()).is_ok());
}
