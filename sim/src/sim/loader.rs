//! Trace Loader.
//!
//! A benchmark is a directory `path/NAME/` holding one trace file per
//! core, `NAME_0.data` through `NAME_{n-1}.data`. Each line is
//! `LABEL VALUE`, where LABEL 0/1/2 classifies the reference as
//! read/write/compute and VALUE is a hexadecimal address (reads and
//! writes) or cycle count (compute). Any malformed line aborts the load
//! with the offending file and line number.

use std::fs;
use std::path::{Path, PathBuf};

use crate::common::error::SimError;
use crate::common::instruction::Instruction;

/// Loads the traces of every core from a benchmark directory.
pub fn load_traces(directory: &Path, num_cores: usize) -> Result<Vec<Vec<Instruction>>, SimError> {
    if !directory.is_dir() {
        return Err(SimError::Config(format!(
            "{} is not a directory",
            directory.display()
        )));
    }
    let benchmark = directory
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| {
            SimError::Config(format!(
                "cannot derive a benchmark name from {}",
                directory.display()
            ))
        })?;

    let mut traces = Vec::with_capacity(num_cores);
    for core in 0..num_cores {
        let path = directory.join(format!("{}_{}.data", benchmark, core));
        traces.push(parse_trace(&path)?);
    }
    Ok(traces)
}

/// Parses one core's trace file.
pub fn parse_trace(path: &Path) -> Result<Vec<Instruction>, SimError> {
    let contents = fs::read_to_string(path).map_err(|source| SimError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let mut instructions = Vec::new();
    for (index, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        instructions.push(parse_line(path, index + 1, line)?);
    }
    Ok(instructions)
}

fn parse_line(path: &Path, line_number: usize, line: &str) -> Result<Instruction, SimError> {
    let mut fields = line.split_whitespace();
    let label = fields.next().unwrap_or("");
    let value = fields
        .next()
        .ok_or_else(|| trace_error(path, line_number, "missing value field"))?;

    let value = u32::from_str_radix(value.trim_start_matches("0x"), 16)
        .map_err(|_| trace_error(path, line_number, &format!("invalid hex value '{}'", value)))?;

    match label {
        "0" => Ok(Instruction::Read(value)),
        "1" => Ok(Instruction::Write(value)),
        "2" => Ok(Instruction::Other(value)),
        other => Err(trace_error(
            path,
            line_number,
            &format!("unknown instruction label '{}'", other),
        )),
    }
}

fn trace_error(path: &Path, line: usize, message: &str) -> SimError {
    SimError::Trace {
        path: PathBuf::from(path),
        line,
        message: message.to_string(),
    }
}
