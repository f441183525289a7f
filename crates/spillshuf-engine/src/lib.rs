//! # spillshuf-engine
//!
//! The main entry point for Spillshuf: configuration, orchestration of the
//! two shuffle phases, and scoped logging.
//!
//! ## Modules
//!
//! - [`config`] - Configuration options
//! - [`shuffler`] - The [`Shuffler`] orchestrator and its [`ShuffleReport`]
//! - [`logging`] - Verbosity levels and per-run log destinations
//!
//! ## Example
//!
//! ```no_run
//! use spillshuf_engine::{ShuffleConfig, Shuffler};
//!
//! let config = ShuffleConfig::new("cooccur.bin", "cooccur.shuf.bin")
//!     .with_memory_limit(512 * 1024 * 1024)
//!     .with_seed(42);
//!
//! let report = Shuffler::new(config).run().expect("shuffle failed");
//! println!("shuffled {} records", report.records);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod logging;
pub mod shuffler;

use std::path::Path;

pub use config::ShuffleConfig;
pub use logging::Verbosity;
pub use shuffler::{ShuffleReport, Shuffler};
pub use spillshuf_common::utils::error::{Error, Result};

/// Shuffles `input_path` into `output_path` under a memory ceiling.
///
/// Segment files are written to `{temp_file_prefix}_NNNN.bin` and removed
/// after a successful merge. Diagnostics at `verbosity` go to `log_path`
/// (appended) or to standard error; the log destination only applies for
/// the duration of this call.
///
/// # Errors
///
/// Returns the first error of any phase; later phases are not attempted.
pub fn shuffle(
    input_path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    temp_file_prefix: impl AsRef<Path>,
    verbosity: Verbosity,
    memory_limit_gb: f64,
    log_path: Option<&Path>,
) -> Result<ShuffleReport> {
    let config = ShuffleConfig::new(input_path.as_ref(), output_path.as_ref())
        .with_temp_prefix(temp_file_prefix.as_ref())
        .with_memory_limit_gb(memory_limit_gb);
    let dispatch = logging::dispatch(verbosity, log_path)?;
    tracing::dispatcher::with_default(&dispatch, || Shuffler::new(config).run())
}
