//! Simulation statistics collection and reporting.
//!
//! The accumulator is the single process-wide sink for counters: per-core
//! instruction mixes, hit counts, idle and compute cycles, per-state hit
//! histograms, and the global bus traffic, write-back, and invalidation
//! totals. All writes happen from the cycle loop; every counter is
//! monotonic.

use std::collections::BTreeMap;

use crate::common::constants::WORD_SIZE_BYTES;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct StateCounter {
    count: u64,
    private: bool,
}

/// All statistics of one simulation run.
#[derive(Debug, Clone, PartialEq)]
pub struct StatisticsAccumulator {
    num_cores: usize,

    num_loads: Vec<u64>,
    num_stores: Vec<u64>,
    num_compute_instructions: Vec<u64>,

    num_read_hits: Vec<u64>,
    num_write_hits: Vec<u64>,

    num_compute_cycles: Vec<u64>,
    num_idle_cycles: Vec<u64>,
    num_invalidates: Vec<u64>,

    completion_cycle: Vec<Option<u64>>,

    read_hits_by_state: Vec<BTreeMap<&'static str, StateCounter>>,
    write_hits_by_state: Vec<BTreeMap<&'static str, StateCounter>>,

    num_bus_traffic_words: u64,
    num_write_backs: u64,
}

impl StatisticsAccumulator {
    /// Creates an accumulator for `num_cores` cores.
    pub fn new(num_cores: usize) -> Self {
        Self {
            num_cores,
            num_loads: vec![0; num_cores],
            num_stores: vec![0; num_cores],
            num_compute_instructions: vec![0; num_cores],
            num_read_hits: vec![0; num_cores],
            num_write_hits: vec![0; num_cores],
            num_compute_cycles: vec![0; num_cores],
            num_idle_cycles: vec![0; num_cores],
            num_invalidates: vec![0; num_cores],
            completion_cycle: vec![None; num_cores],
            read_hits_by_state: vec![BTreeMap::new(); num_cores],
            write_hits_by_state: vec![BTreeMap::new(); num_cores],
            num_bus_traffic_words: 0,
            num_write_backs: 0,
        }
    }

    /// Registers the instruction mix of one core's trace.
    pub fn register_instruction_mix(
        &mut self,
        core: usize,
        loads: u64,
        stores: u64,
        computes: u64,
    ) {
        self.num_loads[core] = loads;
        self.num_stores[core] = stores;
        self.num_compute_instructions[core] = computes;
    }

    /// Latches the cycle at which a core retires its last instruction.
    /// Only the first call per core takes effect.
    pub fn on_run_end(&mut self, core: usize, cycle: u64) {
        if self.completion_cycle[core].is_none() {
            self.completion_cycle[core] = Some(cycle);
        }
    }

    /// Records one cycle spent computing.
    pub fn on_compute(&mut self, core: usize) {
        self.num_compute_cycles[core] += 1;
    }

    /// Records one cycle spent stalled on the memory system.
    pub fn on_idle(&mut self, core: usize) {
        self.num_idle_cycles[core] += 1;
    }

    /// Records a load served from the cache, bucketed by the line state it
    /// was served in.
    pub fn on_read_hit(&mut self, core: usize, state: &'static str, private: bool) {
        self.num_read_hits[core] += 1;
        self.read_hits_by_state[core]
            .entry(state)
            .or_insert(StateCounter { count: 0, private })
            .count += 1;
    }

    /// Records a store served from the cache, bucketed by the line state
    /// it was served in.
    pub fn on_write_hit(&mut self, core: usize, state: &'static str, private: bool) {
        self.num_write_hits[core] += 1;
        self.write_hits_by_state[core]
            .entry(state)
            .or_insert(StateCounter { count: 0, private })
            .count += 1;
    }

    /// Records one completed block write-back to memory.
    pub fn on_write_back(&mut self) {
        self.num_write_backs += 1;
    }

    /// Records words moved across the bus.
    pub fn on_bus_traffic(&mut self, words: u64) {
        self.num_bus_traffic_words += words;
    }

    /// Records an invalidation (or, under update protocols, an update)
    /// applied to a core's line.
    pub fn on_invalidate(&mut self, core: usize) {
        self.num_invalidates[core] += 1;
    }

    pub fn completion_cycle(&self, core: usize) -> Option<u64> {
        self.completion_cycle[core]
    }

    pub fn compute_cycles(&self, core: usize) -> u64 {
        self.num_compute_cycles[core]
    }

    pub fn idle_cycles(&self, core: usize) -> u64 {
        self.num_idle_cycles[core]
    }

    pub fn read_hits(&self, core: usize) -> u64 {
        self.num_read_hits[core]
    }

    pub fn write_hits(&self, core: usize) -> u64 {
        self.num_write_hits[core]
    }

    /// Loads served in the given state.
    pub fn read_hits_in_state(&self, core: usize, state: &str) -> u64 {
        self.read_hits_by_state[core]
            .get(state)
            .map_or(0, |c| c.count)
    }

    /// Stores served in the given state.
    pub fn write_hits_in_state(&self, core: usize, state: &str) -> u64 {
        self.write_hits_by_state[core]
            .get(state)
            .map_or(0, |c| c.count)
    }

    pub fn invalidations(&self, core: usize) -> u64 {
        self.num_invalidates[core]
    }

    pub fn write_backs(&self) -> u64 {
        self.num_write_backs
    }

    pub fn bus_traffic_words(&self) -> u64 {
        self.num_bus_traffic_words
    }

    pub fn bus_traffic_bytes(&self) -> u64 {
        self.num_bus_traffic_words * WORD_SIZE_BYTES as u64
    }

    fn memory_instructions(&self, core: usize) -> u64 {
        self.num_loads[core] + self.num_stores[core]
    }

    /// Prints the full report to stdout.
    pub fn print(&self) {
        let overall = self
            .completion_cycle
            .iter()
            .map(|c| c.unwrap_or(0))
            .max()
            .unwrap_or(0);

        println!("==========================================================");
        println!("COHERENCE SIMULATION STATISTICS");
        println!("==========================================================");
        println!("overall_cycles           {}", overall);
        for core in 0..self.num_cores {
            println!(
                "  core{}.cycles           {}",
                core,
                self.completion_cycle[core].unwrap_or(0)
            );
        }
        println!("----------------------------------------------------------");
        println!("PER-CORE EXECUTION");
        for core in 0..self.num_cores {
            let cycles = self.completion_cycle[core].unwrap_or(0).max(1);
            let memory_instructions = self.memory_instructions(core);
            let instructions = memory_instructions + self.num_compute_instructions[core];
            let hits = self.num_read_hits[core] + self.num_write_hits[core];
            let misses = memory_instructions.saturating_sub(hits);
            let idle = self.num_idle_cycles[core];

            println!("  core {}:", core);
            println!(
                "    compute_cycles       {}",
                self.num_compute_cycles[core]
            );
            println!("    loads_stores         {}", memory_instructions);
            println!(
                "    read_hits            {} ({:.2}%)",
                self.num_read_hits[core],
                percentage(self.num_read_hits[core], self.num_loads[core])
            );
            println!(
                "    write_hits           {} ({:.2}%)",
                self.num_write_hits[core],
                percentage(self.num_write_hits[core], self.num_stores[core])
            );
            println!(
                "    misses               {} ({:.2}%)",
                misses,
                percentage(misses, memory_instructions)
            );
            println!("    ipc                  {:.4}", instructions as f64 / cycles as f64);
            println!(
                "    idle_cycles          {} ({:.2}%)",
                idle,
                percentage(idle, cycles)
            );
        }
        println!("----------------------------------------------------------");
        println!("CACHE HIT STATE HISTOGRAM");
        for core in 0..self.num_cores {
            let (private, public) = self.bucket_totals(core);
            println!("  core {}:", core);
            println!("    private (M/E)        {}", private);
            println!("    public  (shared)     {}", public);
            for (state, counter) in &self.read_hits_by_state[core] {
                println!("    reads in {:<4}        {}", state, counter.count);
            }
            for (state, counter) in &self.write_hits_by_state[core] {
                println!("    writes in {:<4}       {}", state, counter.count);
            }
        }
        println!("----------------------------------------------------------");
        println!("BUS AND MEMORY");
        println!("  bus_traffic            {} bytes", self.bus_traffic_bytes());
        println!("  write_backs            {}", self.num_write_backs);
        for core in 0..self.num_cores {
            println!(
                "  core{}.invalidations    {}",
                core, self.num_invalidates[core]
            );
        }
        println!("==========================================================");
    }

    fn bucket_totals(&self, core: usize) -> (u64, u64) {
        let mut private = 0;
        let mut public = 0;
        for counter in self.read_hits_by_state[core]
            .values()
            .chain(self.write_hits_by_state[core].values())
        {
            if counter.private {
                private += counter.count;
            } else {
                public += counter.count;
            }
        }
        (private, public)
    }
}

fn percentage(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}
