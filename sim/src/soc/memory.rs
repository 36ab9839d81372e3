//! Main Memory Timing.
//!
//! Memory operations are modelled as countdowns. A caller starts an
//! operation with the first call and then polls once per cycle; the call
//! that observes the countdown at zero reports completion. `run_once`
//! advances all countdowns and must be called exactly once per cycle.
//!
//! In write-buffer mode, evictions are accepted immediately into a FIFO
//! that drains one entry at a time in the background. A block fetch whose
//! address still sits in the buffer absorbs the queued write-back and
//! completes with a short, bus-bound delay instead of the full memory
//! penalty.

use std::collections::VecDeque;

use crate::stats::StatisticsAccumulator;

/// A bounded FIFO of pending write-backs.
///
/// Only the head entry drains, one cycle per tick. An entry removed by a
/// coalescing read never reaches memory and is not counted as a write-back.
pub struct WriteBuffer {
    capacity: Option<usize>,
    queue: VecDeque<(u32, u64)>,
}

impl WriteBuffer {
    /// Creates a buffer holding at most `capacity` entries; `None` lifts
    /// the bound.
    pub fn new(capacity: Option<usize>) -> Self {
        Self {
            capacity,
            queue: VecDeque::new(),
        }
    }

    /// Accepts a write-back, or refuses it when the buffer is full.
    pub fn push(&mut self, address: u32, countdown: u64) -> bool {
        if let Some(capacity) = self.capacity {
            if self.queue.len() >= capacity {
                return false;
            }
        }
        self.queue.push_back((address, countdown));
        true
    }

    /// Advances the head entry by one cycle. Returns `true` on the cycle
    /// the head drains to memory.
    pub fn run_once(&mut self) -> bool {
        let Some(head) = self.queue.front_mut() else {
            return false;
        };
        head.1 -= 1;
        if head.1 == 0 {
            self.queue.pop_front();
            return true;
        }
        false
    }

    /// Removes the entry for `address`, reporting whether one was present.
    pub fn remove_if_present(&mut self, address: u32) -> bool {
        if let Some(position) = self.queue.iter().position(|&(a, _)| a == address) {
            self.queue.remove(position);
            return true;
        }
        false
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }
}

/// Models main memory behind the bus.
pub struct MemoryController {
    miss_penalty: u64,
    /// Completion delay for a read coalesced with a buffered write-back.
    read_delay: u64,
    pending_write_back: Option<u64>,
    pending_data_read: Option<u64>,
    write_buffer: Option<WriteBuffer>,
}

impl MemoryController {
    /// Creates a controller that stalls evicting caches for the full
    /// write-back penalty.
    pub fn new(miss_penalty: u64) -> Self {
        Self {
            miss_penalty,
            read_delay: miss_penalty,
            pending_write_back: None,
            pending_data_read: None,
            write_buffer: None,
        }
    }

    /// Creates a controller that accepts evictions into a write buffer.
    pub fn with_write_buffer(miss_penalty: u64, capacity: Option<usize>) -> Self {
        Self {
            miss_penalty,
            read_delay: miss_penalty,
            pending_write_back: None,
            pending_data_read: None,
            write_buffer: Some(WriteBuffer::new(capacity)),
        }
    }

    /// Sets the completion delay for reads that absorb a buffered
    /// write-back.
    pub fn set_delay(&mut self, delay: u64) {
        self.read_delay = delay.max(1);
    }

    /// Advances all countdowns by one cycle. Draining a write-buffer head
    /// records one write-back.
    pub fn run_once(&mut self, stats: &mut StatisticsAccumulator) {
        if let Some(buffer) = &mut self.write_buffer {
            if buffer.run_once() {
                stats.on_write_back();
            }
        } else if let Some(cycles_left) = &mut self.pending_write_back {
            if *cycles_left > 0 {
                *cycles_left -= 1;
            }
        }

        if let Some(cycles_left) = &mut self.pending_data_read {
            if *cycles_left > 0 {
                *cycles_left -= 1;
            }
        }
    }

    /// Starts or continues writing a dirty block back to memory.
    ///
    /// Returns `true` on the cycle the write-back completes. In
    /// write-buffer mode the eviction is accepted immediately unless the
    /// buffer is full.
    pub fn write_back(&mut self, address: u32, stats: &mut StatisticsAccumulator) -> bool {
        if let Some(buffer) = &mut self.write_buffer {
            return buffer.push(address, self.miss_penalty);
        }
        match self.pending_write_back {
            None => {
                self.pending_write_back = Some(self.miss_penalty - 1);
                false
            }
            Some(0) => {
                self.pending_write_back = None;
                stats.on_write_back();
                true
            }
            Some(_) => false,
        }
    }

    /// Starts or continues fetching a block from memory.
    ///
    /// Returns `true` on the cycle the data arrives. If the address still
    /// sits in the write buffer, the queued write-back is absorbed and the
    /// read completes after the short coalescing delay.
    pub fn read_data(&mut self, address: u32) -> bool {
        match self.pending_data_read {
            None => {
                let delay = if let Some(buffer) = &mut self.write_buffer {
                    if buffer.remove_if_present(address) {
                        self.read_delay
                    } else {
                        self.miss_penalty
                    }
                } else {
                    self.miss_penalty
                };
                self.pending_data_read = Some(delay - 1);
                false
            }
            Some(0) => {
                self.pending_data_read = None;
                true
            }
            Some(_) => false,
        }
    }

    /// Reports whether no write-back work remains.
    pub fn is_done(&self) -> bool {
        match &self.write_buffer {
            Some(buffer) => buffer.is_empty(),
            None => matches!(self.pending_write_back, None | Some(0)),
        }
    }
}
