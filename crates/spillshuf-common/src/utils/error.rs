//! Error types for Spillshuf.
//!
//! Every failure is fatal to the run that produced it. The variants name the
//! phase and the path involved so the caller can tell a missing input apart
//! from a full disk or an exhausted memory budget.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for Spillshuf operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for Spillshuf.
#[derive(Error, Debug)]
pub enum Error {
    /// The input file is missing or unreadable.
    #[error("unable to open input file {}: {source}", path.display())]
    InputOpen {
        /// Path of the input file.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// A temporary segment file could not be created.
    #[error("unable to create segment file {}: {source}", path.display())]
    SegmentCreate {
        /// Path of the segment file.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// A temporary segment file could not be opened for reading.
    #[error("unable to open segment file {}: {source}", path.display())]
    SegmentOpen {
        /// Path of the segment file.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// The final output file could not be created.
    #[error("unable to create output file {}: {source}", path.display())]
    OutputCreate {
        /// Path of the output file.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// The log destination could not be opened.
    #[error("unable to open log file {}: {source}", path.display())]
    LogOpen {
        /// Path of the log file.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// No buffer could be allocated down to the minimum capacity.
    #[error("unable to allocate a record buffer: requested {requested} records, floor is {floor}")]
    AllocationExhausted {
        /// Capacity of the first attempt, in records.
        requested: usize,
        /// Smallest capacity that was tried, in records.
        floor: usize,
    },

    /// Recovered segments do not hold every record of the input.
    #[error(
        "segments under {} hold {found} records, input holds {expected}",
        prefix.display()
    )]
    IncompleteSegments {
        /// Segment path prefix that was recovered.
        prefix: PathBuf,
        /// Records in the input file.
        expected: u64,
        /// Records in the recovered segments.
        found: u64,
    },

    /// The shuffle configuration is inconsistent.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A read or write failed after its file was opened.
    #[error("I/O error while {context}: {source}")]
    Io {
        /// What was being done when the error occurred.
        context: String,
        /// Underlying I/O error.
        source: io::Error,
    },
}

impl Error {
    /// Wraps an I/O error with a description of the failing operation.
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Returns the process exit code associated with this error.
    ///
    /// Success is `0`; each error kind maps to its own nonzero code so
    /// scripts can react to, say, a missing input differently from a full
    /// disk.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Io { .. } => 1,
            Self::InputOpen { .. } => 2,
            Self::SegmentCreate { .. } | Self::SegmentOpen { .. } => 3,
            Self::OutputCreate { .. } => 4,
            Self::AllocationExhausted { .. } => 5,
            Self::InvalidConfig(_) => 6,
            Self::LogOpen { .. } => 7,
            Self::IncompleteSegments { .. } => 8,
        }
    }

    /// Returns a short, stable name for the error kind.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InputOpen { .. } => "InputOpenError",
            Self::SegmentCreate { .. } => "SegmentCreateError",
            Self::SegmentOpen { .. } => "SegmentOpenError",
            Self::OutputCreate { .. } => "OutputCreateError",
            Self::LogOpen { .. } => "LogOpenError",
            Self::AllocationExhausted { .. } => "AllocationExhausted",
            Self::IncompleteSegments { .. } => "IncompleteSegments",
            Self::InvalidConfig(_) => "InvalidConfig",
            Self::Io { .. } => "IoError",
        }
    }
}
