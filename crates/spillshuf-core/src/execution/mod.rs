//! The two shuffle phases.
//!
//! ```text
//!  input ──▶ ChunkShuffler ──▶ segment_0000 … segment_K-1 ──▶ MergeShuffler ──▶ output
//!            (fill, permute,      (SegmentStore)                (round-robin,
//!             flush per buffer)                                  permute per round)
//! ```
//!
//! - [`permute`] - In-place Fisher–Yates permutation
//! - [`chunk`] - Phase 1: permute capacity-sized chunks into segments
//! - [`merge`] - Phase 2: interleave segments into the output
//! - [`progress`] - Progress callbacks for both phases
//!
//! Both phases take the random generator by `&mut`, so a single generator
//! drives the whole run. With a seeded generator, the same input and the
//! same capacity always produce the same output bytes.

pub mod chunk;
pub mod merge;
pub mod permute;
pub mod progress;

pub use chunk::{ChunkShuffler, ChunkSummary};
pub use merge::{MergeShuffler, MergeSummary};
pub use permute::fisher_yates;
pub use progress::{NoopProgress, Phase, ProgressObserver};
