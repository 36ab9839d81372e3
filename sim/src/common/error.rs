//! Error Types.
//!
//! All fatal conditions are detected before the cycle loop starts: bad
//! configuration, unreadable files, or malformed trace lines. Inside the
//! steady-state loop, "cannot complete this cycle" is an ordinary return
//! value and never an error.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Errors reported during setup, before the simulation loop.
#[derive(Debug)]
pub enum SimError {
    /// Invalid configuration (geometry, core count, config file contents).
    Config(String),
    /// A file or directory could not be accessed.
    Io { path: PathBuf, source: io::Error },
    /// A trace line could not be parsed.
    Trace {
        path: PathBuf,
        line: usize,
        message: String,
    },
}

impl fmt::Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimError::Config(message) => write!(f, "configuration error: {}", message),
            SimError::Io { path, source } => {
                write!(f, "cannot access {}: {}", path.display(), source)
            }
            SimError::Trace {
                path,
                line,
                message,
            } => write!(f, "{}:{}: {}", path.display(), line, message),
        }
    }
}

impl std::error::Error for SimError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SimError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}
