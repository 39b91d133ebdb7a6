//! Error types for the patchwork index.
//!
//! Organized by the stage that raises them: hierarchy build, query
//! input validation, configuration setup, and chunk generation.

use std::error::Error;
use std::fmt;
use std::io;

use crate::id::{FileIndex, GridId};

/// Errors raised while building the hierarchy arrays from a grid source.
#[derive(Clone, Debug, PartialEq)]
pub enum HierarchyError {
    /// The source announced one grid count but parsed another.
    CountMismatch {
        /// Grids announced by the count pass.
        counted: usize,
        /// Grid records actually produced by the parse pass.
        parsed: usize,
    },
    /// The source produced no grids.
    EmptyHierarchy,
    /// A grid record violates a structural invariant.
    InvalidGrid {
        /// The offending grid.
        grid: GridId,
        /// Which invariant was violated.
        reason: String,
    },
    /// The source itself reported a malformed index.
    Format {
        /// Description supplied by the source.
        reason: String,
    },
}

impl fmt::Display for HierarchyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CountMismatch { counted, parsed } => {
                write!(f, "grid count mismatch: counted {counted}, parsed {parsed}")
            }
            Self::EmptyHierarchy => write!(f, "hierarchy must contain at least one grid"),
            Self::InvalidGrid { grid, reason } => write!(f, "invalid grid {grid}: {reason}"),
            Self::Format { reason } => write!(f, "malformed grid index: {reason}"),
        }
    }
}

impl Error for HierarchyError {}

/// Errors caused by malformed query input.
///
/// Raised before any work is done, so no partial result is produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InputError {
    /// Coordinate sequences for point location differ in length.
    LengthMismatch {
        /// Number of x coordinates.
        x: usize,
        /// Number of y coordinates.
        y: usize,
        /// Number of z coordinates.
        z: usize,
    },
    /// A grid mask does not have one slot per grid.
    MalformedMask {
        /// Number of grids in the tree.
        expected: usize,
        /// Length of the supplied mask.
        actual: usize,
    },
    /// A grid id outside the hierarchy.
    UnknownGrid {
        /// The id that was looked up.
        grid: GridId,
    },
    /// A backing-file index outside the file table.
    UnknownFile {
        /// The index that was looked up.
        file: FileIndex,
    },
}

impl fmt::Display for InputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LengthMismatch { x, y, z } => write!(
                f,
                "coordinate arrays must be the same length, got x={x}, y={y}, z={z}"
            ),
            Self::MalformedMask { expected, actual } => {
                write!(f, "grid mask has {actual} slots, expected {expected}")
            }
            Self::UnknownGrid { grid } => write!(f, "unknown grid {grid}"),
            Self::UnknownFile { file } => write!(f, "unknown backing file {file}"),
        }
    }
}

impl Error for InputError {}

/// Errors detected while validating chunk-planning configuration.
///
/// Always fatal at setup; nothing in the planner retries them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// The chunk sizing mode string is not one of the known modes.
    InvalidChunkSizing {
        /// The rejected value.
        value: String,
    },
    /// A numeric setting is out of range.
    InvalidValue {
        /// Name of the setting.
        name: &'static str,
        /// Why it was rejected.
        reason: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidChunkSizing { value } => write!(
                f,
                "'{value}' is an invalid chunk sizing mode \
                 (expected auto, config_file, just_one or old)"
            ),
            Self::InvalidValue { name, reason } => write!(f, "invalid {name}: {reason}"),
        }
    }
}

impl Error for ConfigError {}

/// Errors surfaced while generating a chunk.
///
/// A failure affects only the chunk in progress; index state is
/// read-only and stays valid.
#[derive(Debug)]
pub enum ChunkError {
    /// The query was malformed.
    Input(InputError),
    /// The I/O layer failed; the error is passed through unmodified.
    Io(io::Error),
}

impl fmt::Display for ChunkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Input(e) => write!(f, "input: {e}"),
            Self::Io(e) => write!(f, "io: {e}"),
        }
    }
}

impl Error for ChunkError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Input(e) => Some(e),
            Self::Io(e) => Some(e),
        }
    }
}

impl From<InputError> for ChunkError {
    fn from(e: InputError) -> Self {
        Self::Input(e)
    }
}

impl From<io::Error> for ChunkError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}
