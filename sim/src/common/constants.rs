//! Global constants of the machine model.

/// Machine word size in bits. Addresses and trace values are 32-bit.
pub const WORD_SIZE: u32 = 32;

/// Machine word size in bytes.
pub const WORD_SIZE_BYTES: u32 = WORD_SIZE / 8;

/// Cycles to fetch or write back a block from/to main memory.
pub const MEMORY_MISS_PENALTY: u64 = 100;

/// Bus cycles consumed per word of a cache-to-cache block transfer.
pub const CACHE_FLUSH_MULTIPLIER: u64 = 2;
