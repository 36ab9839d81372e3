//! Address Decomposition.
//!
//! A 32-bit address splits into three fields: the low bits select a byte
//! within a cache block, the middle bits select a set, and the remaining
//! high bits form the tag.

/// The bit layout used to split addresses for a particular cache geometry.
///
/// Both the cache and every snooping controller must agree on this layout,
/// so it lives here rather than inside the cache itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AddressLayout {
    /// Number of low bits addressing a byte within a block.
    pub offset_bits: u32,
    /// Number of bits addressing a set.
    pub set_index_bits: u32,
}

impl AddressLayout {
    /// Creates a layout for the given number of block-offset and set-index bits.
    pub fn new(offset_bits: u32, set_index_bits: u32) -> Self {
        Self {
            offset_bits,
            set_index_bits,
        }
    }

    /// Splits an address into tag, set index, and block offset.
    pub fn parse(&self, address: u32) -> ParsedAddress {
        let offset = address & ((1 << self.offset_bits) - 1);
        let set_index = (address >> self.offset_bits) & ((1 << self.set_index_bits) - 1);
        let tag = address >> (self.offset_bits + self.set_index_bits);
        ParsedAddress {
            tag,
            set_index,
            offset,
            raw: address,
        }
    }

    /// Reassembles the address of the first byte of a block from its tag
    /// and set index.
    pub fn block_address(&self, tag: u32, set_index: u32) -> u32 {
        (tag << (self.offset_bits + self.set_index_bits)) | (set_index << self.offset_bits)
    }
}

/// An address split into its cache-relevant fields.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParsedAddress {
    /// High bits identifying the block within its set.
    pub tag: u32,
    /// Index of the set this address maps to.
    pub set_index: u32,
    /// Byte offset within the block.
    pub offset: u32,
    /// The original, unsplit address.
    pub raw: u32,
}
