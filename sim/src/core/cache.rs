//! Set-Associative Cache.
//!
//! The cache stores no data, only tags and coherence states; timing and
//! traffic are what the simulation measures. Victim selection is LRU over
//! `last_used` cycle stamps, preferring invalid lines.

use crate::common::addr::{AddressLayout, ParsedAddress};
use crate::config::CacheGeometry;
use crate::protocols::LineState;

/// One cache line: a tag, a coherence state, and an LRU stamp.
///
/// When the status is the protocol's invalid state the tag carries no
/// meaning.
#[derive(Clone, Copy, Debug)]
pub struct CacheLine<S> {
    pub tag: u32,
    pub last_used: u64,
    pub status: S,
}

/// The ways of one set.
#[derive(Clone, Debug)]
pub struct CacheSet<S> {
    pub lines: Vec<CacheLine<S>>,
}

/// A single core's cache.
pub struct Cache<S: LineState> {
    layout: AddressLayout,
    /// 32-bit words per cache line.
    pub num_words_per_line: u32,
    pub sets: Vec<CacheSet<S>>,
}

impl<S: LineState> Cache<S> {
    /// Creates an empty cache for the given geometry. Every line starts
    /// invalid.
    pub fn new(geometry: &CacheGeometry) -> Self {
        let line = CacheLine {
            tag: 0,
            last_used: 0,
            status: S::INVALID,
        };
        let sets = (0..geometry.num_sets())
            .map(|_| CacheSet {
                lines: vec![line; geometry.associativity as usize],
            })
            .collect();
        Self {
            layout: AddressLayout::new(geometry.offset_bits(), geometry.set_index_bits()),
            num_words_per_line: geometry.words_per_block(),
            sets,
        }
    }

    /// Splits an address according to this cache's geometry.
    pub fn parse_address(&self, address: u32) -> ParsedAddress {
        self.layout.parse(address)
    }

    /// Finds the way holding `tag` in the given set, or proposes a victim.
    ///
    /// Returns `(way, true)` for a valid matching line. On a miss, returns
    /// `(way, false)` where `way` is the eviction candidate: the first
    /// invalid line if any, otherwise the line with the smallest
    /// `last_used` stamp. Nothing is evicted here; the protocol handler
    /// overwrites the victim when it fills the line.
    pub fn locate(&self, set_index: u32, tag: u32) -> (usize, bool) {
        let set = &self.sets[set_index as usize];
        for (way, line) in set.lines.iter().enumerate() {
            if line.tag == tag && line.status != S::INVALID {
                return (way, true);
            }
        }
        (self.victim_way(set_index), false)
    }

    fn victim_way(&self, set_index: u32) -> usize {
        let set = &self.sets[set_index as usize];
        let mut oldest_way = 0;
        let mut oldest: Option<u64> = None;
        for (way, line) in set.lines.iter().enumerate() {
            if line.status == S::INVALID {
                return way;
            }
            match oldest {
                Some(stamp) if line.last_used > stamp => {}
                _ => {
                    oldest = Some(line.last_used);
                    oldest_way = way;
                }
            }
        }
        oldest_way
    }

    /// Borrows a line by set and way.
    pub fn line(&self, set_index: u32, way: usize) -> &CacheLine<S> {
        &self.sets[set_index as usize].lines[way]
    }

    /// Mutably borrows a line by set and way.
    pub fn line_mut(&mut self, set_index: u32, way: usize) -> &mut CacheLine<S> {
        &mut self.sets[set_index as usize].lines[way]
    }

    /// Refreshes a line's LRU stamp to the current cycle.
    pub fn touch(&mut self, set_index: u32, way: usize, cycle: u64) {
        self.line_mut(set_index, way).last_used = cycle;
    }

    /// Installs a block into a line, overwriting whatever the line held.
    pub fn fill(&mut self, set_index: u32, way: usize, tag: u32, status: S, cycle: u64) {
        let line = self.line_mut(set_index, way);
        line.tag = tag;
        line.status = status;
        line.last_used = cycle;
    }

    /// Reconstructs the block address held by a line.
    pub fn line_address(&self, set_index: u32, way: usize) -> u32 {
        let line = self.line(set_index, way);
        self.layout.block_address(line.tag, set_index)
    }

    /// Looks up the coherence state of the line holding `address`, if any
    /// valid line holds it.
    pub fn status_of(&self, address: u32) -> Option<S> {
        let parsed = self.parse_address(address);
        let (way, is_hit) = self.locate(parsed.set_index, parsed.tag);
        if is_hit {
            Some(self.line(parsed.set_index, way).status)
        } else {
            None
        }
    }
}
