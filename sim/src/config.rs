//! Simulator Configuration.
//!
//! Cache geometry and core count come from the command line; the remaining
//! system parameters (memory timing, write buffer, progress reporting) come
//! from an optional TOML file. Every field has a default so an empty file
//! and no file at all behave identically.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::common::constants::MEMORY_MISS_PENALTY;
use crate::common::error::SimError;

const DEFAULT_CACHE_SIZE: u32 = 4096;
const DEFAULT_ASSOCIATIVITY: u32 = 2;
const DEFAULT_BLOCK_SIZE: u32 = 32;
const DEFAULT_NUM_CORES: usize = 2;
const DEFAULT_WRITE_BUFFER_CAPACITY: i64 = 8;

/// Contents of the optional TOML configuration file.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct SimConfig {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub memory: MemoryConfig,
}

impl SimConfig {
    /// Reads and parses a TOML configuration file.
    pub fn load(path: &Path) -> Result<Self, SimError> {
        let contents = fs::read_to_string(path).map_err(|source| SimError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents)
            .map_err(|error| SimError::Config(format!("{}: {}", path.display(), error)))
    }
}

/// General run parameters.
#[derive(Debug, Deserialize, Clone)]
pub struct GeneralConfig {
    /// Print a progress line every this many cycles. Zero disables it.
    #[serde(default)]
    pub progress_interval: u64,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            progress_interval: 0,
        }
    }
}

/// Main memory timing parameters.
#[derive(Debug, Deserialize, Clone)]
pub struct MemoryConfig {
    /// Cycles for a block fetch or write-back against main memory.
    #[serde(default = "default_miss_penalty")]
    pub miss_penalty: u64,

    /// Route evictions through a draining write buffer instead of
    /// stalling the evicting cache for a full write-back.
    #[serde(default)]
    pub write_buffer: bool,

    /// Write buffer capacity in entries. `-1` lifts the bound.
    #[serde(default = "default_write_buffer_capacity")]
    pub write_buffer_capacity: i64,
}

impl MemoryConfig {
    /// Capacity as an option: `None` means unbounded.
    pub fn capacity(&self) -> Option<usize> {
        if self.write_buffer_capacity < 0 {
            None
        } else {
            Some(self.write_buffer_capacity as usize)
        }
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            miss_penalty: default_miss_penalty(),
            write_buffer: false,
            write_buffer_capacity: default_write_buffer_capacity(),
        }
    }
}

fn default_miss_penalty() -> u64 {
    MEMORY_MISS_PENALTY
}

fn default_write_buffer_capacity() -> i64 {
    DEFAULT_WRITE_BUFFER_CAPACITY
}

/// Cache geometry shared by every core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheGeometry {
    /// Total cache size in bytes.
    pub cache_size: u32,
    /// Number of ways per set.
    pub associativity: u32,
    /// Block size in bytes.
    pub block_size: u32,
}

impl CacheGeometry {
    /// Creates a geometry after validating it.
    ///
    /// Sizes must be powers of two, blocks must hold at least one word,
    /// and the cache must divide evenly into sets.
    pub fn new(cache_size: u32, associativity: u32, block_size: u32) -> Result<Self, SimError> {
        let geometry = Self {
            cache_size,
            associativity,
            block_size,
        };
        geometry.validate()?;
        Ok(geometry)
    }

    fn validate(&self) -> Result<(), SimError> {
        if self.block_size < 4 || !self.block_size.is_power_of_two() {
            return Err(SimError::Config(format!(
                "block size must be a power of two of at least 4 bytes, got {}",
                self.block_size
            )));
        }
        if self.associativity == 0 {
            return Err(SimError::Config("associativity must be at least 1".into()));
        }
        let set_bytes = self.associativity * self.block_size;
        if self.cache_size == 0 || self.cache_size % set_bytes != 0 {
            return Err(SimError::Config(format!(
                "cache size {} is not a multiple of associativity x block size ({})",
                self.cache_size, set_bytes
            )));
        }
        let num_sets = self.cache_size / set_bytes;
        if !num_sets.is_power_of_two() {
            return Err(SimError::Config(format!(
                "number of sets must be a power of two, got {}",
                num_sets
            )));
        }
        Ok(())
    }

    /// Number of sets in the cache.
    pub fn num_sets(&self) -> u32 {
        self.cache_size / (self.associativity * self.block_size)
    }

    /// Bits addressing a byte within a block.
    pub fn offset_bits(&self) -> u32 {
        self.block_size.trailing_zeros()
    }

    /// Bits addressing a set.
    pub fn set_index_bits(&self) -> u32 {
        self.num_sets().trailing_zeros()
    }

    /// Number of 32-bit words in a block.
    pub fn words_per_block(&self) -> u32 {
        self.block_size / crate::common::constants::WORD_SIZE_BYTES
    }
}

impl Default for CacheGeometry {
    fn default() -> Self {
        Self {
            cache_size: DEFAULT_CACHE_SIZE,
            associativity: DEFAULT_ASSOCIATIVITY,
            block_size: DEFAULT_BLOCK_SIZE,
        }
    }
}

/// The fully resolved configuration of one simulation.
#[derive(Debug, Clone)]
pub struct SystemConfig {
    pub geometry: CacheGeometry,
    pub num_cores: usize,
    pub general: GeneralConfig,
    pub memory: MemoryConfig,
}

impl SystemConfig {
    /// Combines CLI geometry with file-level parameters, validating both.
    pub fn new(
        geometry: CacheGeometry,
        num_cores: usize,
        file: SimConfig,
    ) -> Result<Self, SimError> {
        if num_cores == 0 {
            return Err(SimError::Config("core count must be at least 1".into()));
        }
        if file.memory.miss_penalty == 0 {
            return Err(SimError::Config("memory miss penalty must be nonzero".into()));
        }
        Ok(Self {
            geometry,
            num_cores,
            general: file.general,
            memory: file.memory,
        })
    }
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            geometry: CacheGeometry::default(),
            num_cores: DEFAULT_NUM_CORES,
            general: GeneralConfig::default(),
            memory: MemoryConfig::default(),
        }
    }
}
