//! Cycle-Level Driver.
//!
//! One `Simulator` owns every agent of the machine and advances them with
//! a fixed per-cycle order:
//!
//! 1. the memory controller advances its countdowns,
//! 2. the bus clears its per-cycle arbitration latch,
//! 3. each processor steps once, in index order.
//!
//! There is no other source of progress; all apparent concurrency is
//! state machines moving one tick at a time under this loop.

use crate::config::SystemConfig;
use crate::common::constants::CACHE_FLUSH_MULTIPLIER;
use crate::common::instruction::Instruction;
use crate::core::cache::Cache;
use crate::core::controller::CacheController;
use crate::core::processor::Processor;
use crate::protocols::Protocol;
use crate::soc::bus::Bus;
use crate::soc::memory::MemoryController;
use crate::stats::StatisticsAccumulator;

/// A complete machine: processors, controllers, bus, memory, statistics.
pub struct Simulator<P: Protocol> {
    processors: Vec<Processor>,
    controllers: Vec<CacheController<P>>,
    bus: Bus,
    memory: MemoryController,
    stats: StatisticsAccumulator,
    cycle: u64,
    progress_interval: u64,
}

impl<P: Protocol> Simulator<P> {
    /// Builds a machine with one core per trace.
    pub fn new(config: &SystemConfig, traces: Vec<Vec<Instruction>>) -> Self {
        let num_cores = traces.len();
        let mut stats = StatisticsAccumulator::new(num_cores);
        for (core, trace) in traces.iter().enumerate() {
            let mut loads = 0;
            let mut stores = 0;
            let mut computes = 0;
            for instruction in trace {
                match instruction {
                    Instruction::Read(_) => loads += 1,
                    Instruction::Write(_) => stores += 1,
                    Instruction::Other(_) => computes += 1,
                }
            }
            stats.register_instruction_mix(core, loads, stores, computes);
        }

        let mut memory = if config.memory.write_buffer {
            MemoryController::with_write_buffer(
                config.memory.miss_penalty,
                config.memory.capacity(),
            )
        } else {
            MemoryController::new(config.memory.miss_penalty)
        };
        memory.set_delay(CACHE_FLUSH_MULTIPLIER * config.geometry.words_per_block() as u64);

        let controllers = (0..num_cores)
            .map(|id| CacheController::new(id, Cache::new(&config.geometry)))
            .collect();
        let processors = traces
            .into_iter()
            .enumerate()
            .map(|(id, trace)| Processor::new(id, trace))
            .collect();

        Self {
            processors,
            controllers,
            bus: Bus::new(num_cores),
            memory,
            stats,
            cycle: 0,
            progress_interval: config.general.progress_interval,
        }
    }

    /// Advances the whole machine by one cycle.
    pub fn step(&mut self) {
        self.memory.run_once(&mut self.stats);
        self.bus.reset();
        for id in 0..self.processors.len() {
            let was_done = self.processors[id].is_done();
            self.processors[id].run_once(
                self.cycle,
                &mut self.controllers,
                &mut self.bus,
                &mut self.memory,
                &mut self.stats,
            );
            if !was_done && self.processors[id].is_done() {
                self.stats.on_run_end(id, self.cycle);
            }
        }
        self.cycle += 1;
    }

    /// Runs the machine until every trace has retired, then drains any
    /// write-backs still queued in the memory controller so they are
    /// accounted for. Returns the final cycle count.
    pub fn run(&mut self) -> u64 {
        while !self.is_done() {
            self.step();
            if self.progress_interval > 0 && self.cycle % self.progress_interval == 0 {
                let remaining: usize = self.processors.iter().map(|p| p.remaining()).sum();
                println!(
                    "[Sim] cycle {:>12}  remaining instructions {}",
                    self.cycle, remaining
                );
            }
        }
        while !self.memory.is_done() {
            self.memory.run_once(&mut self.stats);
            self.cycle += 1;
        }
        self.cycle
    }

    /// True once every processor has retired its whole trace.
    pub fn is_done(&self) -> bool {
        self.processors.iter().all(|p| p.is_done())
    }

    /// Cycles elapsed so far.
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    pub fn stats(&self) -> &StatisticsAccumulator {
        &self.stats
    }

    pub fn into_stats(self) -> StatisticsAccumulator {
        self.stats
    }

    /// The coherence state core `id` holds `address` in, if any.
    pub fn line_status(&self, id: usize, address: u32) -> Option<P::Status> {
        self.controllers[id].cache.status_of(address)
    }
}
