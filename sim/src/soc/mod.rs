//! Shared Interconnect and Memory.
//!
//! The single bus serialises every coherence transaction, and the memory
//! controller models main-memory latency behind it.

/// Bus arbiter, request line, and per-controller response lines.
pub mod bus;

/// Main memory timing, with an optional draining write buffer.
pub mod memory;

pub use bus::{Bus, BusRequest, BusRequestKind};
pub use memory::{MemoryController, WriteBuffer};
