//! # spillshuf-common
//!
//! Foundation layer for Spillshuf: the record type, the error taxonomy, and
//! the memory budgeter that turns a memory ceiling into a buffer capacity.
//!
//! This crate has no internal dependencies and should be kept minimal.
//!
//! ## Modules
//!
//! - [`types`] - The fixed-size [`Record`] and its on-disk encoding
//! - [`memory`] - Memory budgeting ([`MemoryBudgeter`], allocation probes)
//! - [`utils`] - Utility functions and helpers (errors)

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod memory;
pub mod types;
pub mod utils;

// Re-export commonly used types at crate root
pub use memory::{AllocationProbe, Budget, HeapProbe, MemoryBudgeter};
pub use types::{RECORD_SIZE, Record};
pub use utils::error::{Error, Result};
