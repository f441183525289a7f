//! Shuffle configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use spillshuf_common::memory::{DEFAULT_MIN_CAPACITY, DEFAULT_SAFETY_FRACTION, gigabytes_to_bytes};
use spillshuf_common::utils::error::{Error, Result};

/// Default memory ceiling: 2 GiB.
pub const DEFAULT_MEMORY_LIMIT: u64 = 2 * 1024 * 1024 * 1024;

/// File name used for the segment prefix when none is given.
pub const DEFAULT_TEMP_NAME: &str = "shuf.tmp";

/// Configuration for one shuffle run.
///
/// Everything the phases need is carried here; there is no process-wide
/// state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShuffleConfig {
    /// File to read records from.
    pub input: PathBuf,

    /// File to write the shuffled records to.
    pub output: PathBuf,

    /// Prefix for segment files. `None` places them next to the output.
    pub temp_prefix: Option<PathBuf>,

    /// Memory ceiling for the record buffer, in bytes.
    pub memory_limit: u64,

    /// Share of the ceiling the buffer may use.
    pub safety_fraction: f64,

    /// Smallest buffer capacity the memory probe may settle for.
    pub min_capacity: usize,

    /// Fixed buffer capacity, bypassing the memory probe.
    pub capacity: Option<usize>,

    /// Seed for the random generator. `None` seeds from the OS.
    pub seed: Option<u64>,
}

impl ShuffleConfig {
    /// Creates a configuration with default limits.
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            temp_prefix: None,
            memory_limit: DEFAULT_MEMORY_LIMIT,
            safety_fraction: DEFAULT_SAFETY_FRACTION,
            min_capacity: DEFAULT_MIN_CAPACITY,
            capacity: None,
            seed: None,
        }
    }

    /// Sets the segment file prefix.
    pub fn with_temp_prefix(mut self, prefix: impl Into<PathBuf>) -> Self {
        self.temp_prefix = Some(prefix.into());
        self
    }

    /// Sets the memory ceiling in bytes.
    pub fn with_memory_limit(mut self, bytes: u64) -> Self {
        self.memory_limit = bytes;
        self
    }

    /// Sets the memory ceiling in gigabytes.
    pub fn with_memory_limit_gb(mut self, gigabytes: f64) -> Self {
        self.memory_limit = gigabytes_to_bytes(gigabytes);
        self
    }

    /// Sets the safety fraction.
    pub fn with_safety_fraction(mut self, fraction: f64) -> Self {
        self.safety_fraction = fraction;
        self
    }

    /// Sets the minimum capacity for the memory probe.
    pub fn with_min_capacity(mut self, records: usize) -> Self {
        self.min_capacity = records;
        self
    }

    /// Fixes the buffer capacity, skipping the memory probe.
    pub fn with_capacity(mut self, records: usize) -> Self {
        self.capacity = Some(records);
        self
    }

    /// Seeds the random generator for reproducible output.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Returns the effective segment prefix.
    #[must_use]
    pub fn temp_prefix(&self) -> PathBuf {
        if let Some(prefix) = &self.temp_prefix {
            return prefix.clone();
        }
        match self.output.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.join(DEFAULT_TEMP_NAME),
            _ => PathBuf::from(DEFAULT_TEMP_NAME),
        }
    }

    /// Checks the configuration for inconsistencies.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        if self.input == self.output {
            return Err(Error::InvalidConfig(format!(
                "input and output are the same file: {}",
                self.input.display()
            )));
        }
        if self.capacity == Some(0) {
            return Err(Error::InvalidConfig(
                "capacity must be at least one record".to_string(),
            ));
        }
        if self.capacity.is_none() {
            if self.memory_limit == 0 {
                return Err(Error::InvalidConfig(
                    "memory limit must be positive".to_string(),
                ));
            }
            if !(self.safety_fraction > 0.0 && self.safety_fraction <= 1.0) {
                return Err(Error::InvalidConfig(format!(
                    "safety fraction must be in (0, 1], got {}",
                    self.safety_fraction
                )));
            }
            if self.min_capacity == 0 {
                return Err(Error::InvalidConfig(
                    "minimum capacity must be at least one record".to_string(),
                ));
            }
        }
        if self.temp_prefix() == self.output {
            return Err(Error::InvalidConfig(
                "temporary prefix must differ from the output path".to_string(),
            ));
        }
        Ok(())
    }
}
