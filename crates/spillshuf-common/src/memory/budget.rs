//! Probe-and-shrink capacity estimation.
//!
//! The naive `fraction * ceiling / RECORD_SIZE` estimate ignores allocator
//! overhead and fragmentation. [`MemoryBudgeter`] validates the estimate by
//! actually reserving a buffer of that size and shrinks it by 5% on every
//! failure, down to a minimum floor.
//!
//! ```text
//! initial = floor(fraction * ceiling / RECORD_SIZE)
//!    │
//!    ▼
//! probe(capacity) ── ok ──▶ Budget { capacity }
//!    │ fail
//!    ▼
//! capacity == floor ── yes ──▶ Error::AllocationExhausted
//!    │ no
//!    ▼
//! capacity = max(floor, capacity - capacity / 20)   (at least one less)
//! ```

use serde::Serialize;

use crate::types::{RECORD_SIZE, Record};
use crate::utils::error::{Error, Result};

/// Share of the memory ceiling handed to the record buffer.
pub const DEFAULT_SAFETY_FRACTION: f64 = 0.95;

/// Smallest capacity the budgeter will settle for.
pub const DEFAULT_MIN_CAPACITY: usize = 2;

const BYTES_PER_GIGABYTE: f64 = 1_073_741_824.0;

/// Converts a size in (binary) gigabytes to bytes.
#[must_use]
pub fn gigabytes_to_bytes(gigabytes: f64) -> u64 {
    if gigabytes.is_nan() || gigabytes <= 0.0 {
        return 0;
    }
    (gigabytes * BYTES_PER_GIGABYTE) as u64
}

/// Answers whether a buffer of a given number of records can be allocated.
///
/// The default implementation is [`HeapProbe`]. Tests substitute probes that
/// fail above a threshold to exercise the shrink path.
pub trait AllocationProbe {
    /// Returns `true` if a buffer holding `records` records was allocated.
    fn try_allocate(&self, records: usize) -> bool;
}

impl<F> AllocationProbe for F
where
    F: Fn(usize) -> bool,
{
    fn try_allocate(&self, records: usize) -> bool {
        self(records)
    }
}

/// Probes the global allocator with a fallible reservation.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeapProbe;

impl AllocationProbe for HeapProbe {
    fn try_allocate(&self, records: usize) -> bool {
        let mut buffer: Vec<Record> = Vec::new();
        buffer.try_reserve_exact(records).is_ok()
    }
}

/// The outcome of budgeting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Budget {
    /// Validated buffer capacity, in records.
    pub capacity: usize,
    /// The capacity the first probe asked for.
    pub initial: usize,
    /// Number of probes performed.
    pub attempts: usize,
}

impl Budget {
    /// Returns a budget that was fixed by the caller instead of probed.
    #[must_use]
    pub fn fixed(capacity: usize) -> Self {
        Self {
            capacity,
            initial: capacity,
            attempts: 0,
        }
    }

    /// Returns whether the capacity had to shrink below the first estimate.
    #[must_use]
    pub fn was_reduced(&self) -> bool {
        self.capacity < self.initial
    }
}

/// Converts a memory ceiling into a safe record-buffer capacity.
#[derive(Debug, Clone)]
pub struct MemoryBudgeter {
    ceiling_bytes: u64,
    fraction: f64,
    min_capacity: usize,
}

impl MemoryBudgeter {
    /// Creates a budgeter for the given ceiling with default settings.
    #[must_use]
    pub fn new(ceiling_bytes: u64) -> Self {
        Self {
            ceiling_bytes,
            fraction: DEFAULT_SAFETY_FRACTION,
            min_capacity: DEFAULT_MIN_CAPACITY,
        }
    }

    /// Sets the share of the ceiling the buffer may use.
    pub fn with_fraction(mut self, fraction: f64) -> Self {
        self.fraction = fraction;
        self
    }

    /// Sets the minimum capacity, in records.
    pub fn with_min_capacity(mut self, min_capacity: usize) -> Self {
        self.min_capacity = min_capacity.max(1);
        self
    }

    /// Returns the unvalidated `floor(fraction * ceiling / RECORD_SIZE)`.
    #[must_use]
    pub fn initial_estimate(&self) -> usize {
        let usable = self.fraction * self.ceiling_bytes as f64;
        (usable / RECORD_SIZE as f64).floor() as usize
    }

    /// Computes a capacity validated against the global allocator.
    pub fn budget(&self) -> Result<Budget> {
        self.budget_with(&HeapProbe)
    }

    /// Computes a capacity validated against `probe`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AllocationExhausted`] if even the minimum capacity
    /// cannot be allocated.
    pub fn budget_with(&self, probe: &dyn AllocationProbe) -> Result<Budget> {
        let initial = self.initial_estimate().max(self.min_capacity);
        let mut capacity = initial;
        let mut attempts = 0;

        loop {
            attempts += 1;
            if probe.try_allocate(capacity) {
                break;
            }
            if capacity <= self.min_capacity {
                return Err(Error::AllocationExhausted {
                    requested: initial,
                    floor: self.min_capacity,
                });
            }
            let shrunk = (capacity - capacity / 20).min(capacity - 1);
            capacity = shrunk.max(self.min_capacity);
            tracing::debug!(capacity, "Allocation probe failed, shrinking buffer");
        }

        let budget = Budget {
            capacity,
            initial,
            attempts,
        };
        if budget.was_reduced() {
            tracing::warn!(
                initial,
                capacity,
                attempts,
                "Reduced buffer capacity to fit the memory ceiling"
            );
        }
        Ok(budget)
    }
}
