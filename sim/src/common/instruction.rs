//! Trace Instructions.
//!
//! A trace is a finite sequence of classified memory references. Loads and
//! stores carry the referenced address; compute bursts carry the number of
//! cycles the core spends off the memory system.

/// One entry of a per-core trace.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Instruction {
    /// Load from the given address.
    Read(u32),
    /// Store to the given address.
    Write(u32),
    /// Compute for the given number of cycles without touching memory.
    Other(u32),
}

/// Whether a memory reference is a load or a store.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccessKind {
    /// Load.
    Read,
    /// Store.
    Write,
}
