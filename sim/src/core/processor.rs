//! Trace-Replaying Processor.
//!
//! A processor holds a finite trace and a single in-flight instruction
//! slot. Compute bursts are consumed locally one cycle at a time; loads
//! and stores are presented to the cache controller, which either retires
//! them or asks for the same instruction again next cycle.

use crate::common::instruction::{AccessKind, Instruction};
use crate::protocols::{AccessOutcome, Protocol};
use crate::soc::bus::Bus;
use crate::soc::memory::MemoryController;
use crate::stats::StatisticsAccumulator;

use super::controller::{self, CacheController};

/// One core's instruction stream.
pub struct Processor {
    id: usize,
    trace: Vec<Instruction>,
    next_index: usize,
    current: Option<Instruction>,
}

impl Processor {
    pub fn new(id: usize, trace: Vec<Instruction>) -> Self {
        Self {
            id,
            trace,
            next_index: 0,
            current: None,
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    /// True once the trace is exhausted and nothing is in flight. Further
    /// `run_once` calls are no-ops from then on.
    pub fn is_done(&self) -> bool {
        self.next_index >= self.trace.len() && self.current.is_none()
    }

    /// Instructions not yet fetched from the trace.
    pub fn remaining(&self) -> usize {
        self.trace.len() - self.next_index
    }

    /// Advances this core by one cycle.
    pub fn run_once<P: Protocol>(
        &mut self,
        cycle: u64,
        ctrls: &mut [CacheController<P>],
        bus: &mut Bus,
        memory: &mut MemoryController,
        stats: &mut StatisticsAccumulator,
    ) {
        if self.is_done() {
            return;
        }
        if self.current.is_none() {
            self.current = Some(self.trace[self.next_index]);
            self.next_index += 1;
        }
        let instruction = match self.current {
            Some(instruction) => instruction,
            None => return,
        };

        match instruction {
            Instruction::Other(cycles_left) => {
                stats.on_compute(self.id);
                if cycles_left > 1 {
                    self.current = Some(Instruction::Other(cycles_left - 1));
                } else {
                    self.current = None;
                }
            }
            Instruction::Read(address) | Instruction::Write(address) => {
                let kind = match instruction {
                    Instruction::Write(_) => AccessKind::Write,
                    _ => AccessKind::Read,
                };
                let outcome = controller::processor_request(
                    ctrls, self.id, kind, address, cycle, bus, memory, stats,
                );
                match outcome {
                    AccessOutcome::Completed => self.current = None,
                    AccessOutcome::Stalled => stats.on_idle(self.id),
                }
            }
        }
    }
}
