//! Memory budgeting for record buffers.
//!
//! The shuffle keeps exactly one record buffer alive at a time. This module
//! decides how large that buffer may be under a memory ceiling.
//!
//! # Usage
//!
//! ```
//! use spillshuf_common::memory::MemoryBudgeter;
//!
//! // 1 MiB ceiling, default 95% safety fraction
//! let budget = MemoryBudgeter::new(1024 * 1024).budget().unwrap();
//! assert!(budget.capacity >= 2);
//! ```

mod budget;

pub use budget::{
    AllocationProbe, Budget, DEFAULT_MIN_CAPACITY, DEFAULT_SAFETY_FRACTION, HeapProbe,
    MemoryBudgeter, gigabytes_to_bytes,
};
