//! Target game process: discovery and memory reads

pub mod memory;
pub mod process;

pub use memory::{GamePosition, MemoryReader, ProcMemoryReader};
pub use process::TargetProcess;

use std::path::PathBuf;

/// Errors while locating the game process
#[derive(Debug, thiserror::Error)]
pub enum TargetError {
    #[error("No process matches {0:?}")]
    NotFound(String),

    #[error("Failed to scan {path}: {source}")]
    Procfs {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Errors while reading the game's memory
///
/// These are transient: the tick treats the position as unavailable.
#[derive(Debug, thiserror::Error)]
pub enum MemoryError {
    #[error("Failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to read at {offset:#x}: {source}")]
    Read { offset: u64, source: std::io::Error },

    #[error("Short read at {offset:#x}: expected {expected} bytes, got {actual}")]
    ShortRead {
        offset: u64,
        expected: usize,
        actual: usize,
    },
}
