//! Verbosity levels and per-run log destinations.
//!
//! Library code only emits `tracing` events. Where those events go is
//! decided by the caller: the CLI installs a global subscriber, while
//! [`crate::shuffle`] builds a [`Dispatch`] with [`dispatch`] and activates it
//! only for the duration of one run.

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use spillshuf_common::utils::error::{Error, Result};
use tracing::{Dispatch, Level};

/// How much the shuffle reports about itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum Verbosity {
    /// Warnings and errors only.
    Low,
    /// Phase summaries.
    #[default]
    Medium,
    /// Per-segment and per-round progress.
    High,
}

impl Verbosity {
    /// Returns the most detailed level that is emitted.
    #[must_use]
    pub fn level(self) -> Level {
        match self {
            Self::Low => Level::WARN,
            Self::Medium => Level::INFO,
            Self::High => Level::DEBUG,
        }
    }
}

impl From<u8> for Verbosity {
    /// Maps `0`, `1`, `2` to `Low`, `Medium`, `High`; larger values saturate.
    fn from(value: u8) -> Self {
        match value {
            0 => Self::Low,
            1 => Self::Medium,
            _ => Self::High,
        }
    }
}

/// Builds a dispatcher that writes events up to `verbosity`.
///
/// Events are appended to `log_path` when given, otherwise written to
/// standard error.
///
/// # Errors
///
/// Returns [`Error::LogOpen`] if the log file cannot be opened.
pub fn dispatch(verbosity: Verbosity, log_path: Option<&Path>) -> Result<Dispatch> {
    let builder = tracing_subscriber::fmt()
        .with_max_level(verbosity.level())
        .with_target(false);

    let Some(path) = log_path else {
        return Ok(Dispatch::new(builder.with_writer(std::io::stderr).finish()));
    };
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| Error::LogOpen {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(Dispatch::new(
        builder.with_writer(Mutex::new(file)).with_ansi(false).finish(),
    ))
}
