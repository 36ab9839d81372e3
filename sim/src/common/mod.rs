//! Common types shared across the simulator.
//!
//! This module provides the fundamental vocabulary of the machine model:
//! parsed addresses, trace instructions, global timing constants, and the
//! error type reported before the simulation loop starts.

/// Address decomposition into tag / set index / block offset.
pub mod addr;

/// Global timing and sizing constants.
pub mod constants;

/// Error types raised during configuration and trace loading.
pub mod error;

/// Trace instructions and memory access kinds.
pub mod instruction;

pub use addr::{AddressLayout, ParsedAddress};
pub use error::SimError;
pub use instruction::{AccessKind, Instruction};
