//! Coherence Simulator CLI.
//!
//! Parses the command line, loads the optional TOML configuration and the
//! per-core traces, runs the simulation under the chosen protocol, and
//! prints the statistics report.

use clap::Parser;
use std::path::PathBuf;
use std::process;

use snoopsim::common::error::SimError;
use snoopsim::common::instruction::Instruction;
use snoopsim::config::{CacheGeometry, SimConfig, SystemConfig};
use snoopsim::protocols::{Dragon, Mesi, Mesif, Moesi, Protocol, ProtocolKind};
use snoopsim::sim::loader;
use snoopsim::sim::Simulator;
use snoopsim::stats::StatisticsAccumulator;

/// Command-line arguments.
#[derive(Parser, Debug)]
#[command(author, version, about = "Snooping cache-coherence simulator")]
struct Args {
    /// Coherence protocol to simulate.
    #[arg(ignore_case = true)]
    protocol: ProtocolKind,

    /// Benchmark directory holding one `NAME_<core>.data` trace per core.
    input_directory: PathBuf,

    /// Total cache size in bytes.
    #[arg(long = "cache_size", default_value_t = 4096)]
    cache_size: u32,

    /// Cache associativity.
    #[arg(long = "associativity", default_value_t = 2)]
    associativity: u32,

    /// Cache block size in bytes.
    #[arg(long = "block_size", default_value_t = 32)]
    block_size: u32,

    /// Number of cores (one trace file per core).
    #[arg(long, default_value_t = 2)]
    cores: usize,

    /// Optional TOML file with memory and run parameters.
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() {
    let args = Args::parse();
    if let Err(error) = run(args) {
        eprintln!("[!] {}", error);
        process::exit(1);
    }
}

fn run(args: Args) -> Result<(), SimError> {
    let file_config = match &args.config {
        Some(path) => SimConfig::load(path)?,
        None => SimConfig::default(),
    };

    let geometry = CacheGeometry::new(args.cache_size, args.associativity, args.block_size)?;
    let config = SystemConfig::new(geometry, args.cores, file_config)?;
    let traces = loader::load_traces(&args.input_directory, config.num_cores)?;

    print_banner(&args, &config);

    let stats = match args.protocol {
        ProtocolKind::Mesi => simulate::<Mesi>(&config, traces),
        ProtocolKind::Dragon => simulate::<Dragon>(&config, traces),
        ProtocolKind::Moesi => simulate::<Moesi>(&config, traces),
        ProtocolKind::Mesif => simulate::<Mesif>(&config, traces),
    };
    stats.print();
    Ok(())
}

fn simulate<P: Protocol>(
    config: &SystemConfig,
    traces: Vec<Vec<Instruction>>,
) -> StatisticsAccumulator {
    let mut simulator = Simulator::<P>::new(config, traces);
    let cycles = simulator.run();
    println!("[Sim] {} simulation complete at cycle {}", P::NAME, cycles);
    simulator.into_stats()
}

fn print_banner(args: &Args, config: &SystemConfig) {
    println!("Simulation Configuration");
    println!("------------------------");
    println!("Protocol:       {}", args.protocol.name());
    println!("Benchmark:      {}", args.input_directory.display());
    println!("Cores:          {}", config.num_cores);
    println!(
        "Cache:          {} bytes, {}-way, {}-byte blocks ({} sets)",
        config.geometry.cache_size,
        config.geometry.associativity,
        config.geometry.block_size,
        config.geometry.num_sets()
    );
    println!("Miss penalty:   {} cycles", config.memory.miss_penalty);
    println!(
        "Write buffer:   {}",
        if config.memory.write_buffer {
            match config.memory.capacity() {
                Some(capacity) => format!("enabled ({} entries)", capacity),
                None => "enabled (unbounded)".to_string(),
            }
        } else {
            "disabled".to_string()
        }
    );
    println!("------------------------");
}
