//! # spillshuf-core
//!
//! Core layer for Spillshuf: the two shuffle phases and the temporary
//! segment storage they share. Depends only on `spillshuf-common`.
//!
//! ## Modules
//!
//! - [`execution`] - Permutation, the chunk phase, and the merge phase
//! - [`storage`] - Record streams, temporary segment files, file digests

pub mod execution;
pub mod storage;

// Re-export commonly used types
pub use execution::{
    ChunkShuffler, ChunkSummary, MergeShuffler, MergeSummary, NoopProgress, Phase,
    ProgressObserver, fisher_yates,
};
pub use storage::{FileDigest, RecordReader, RecordWriter, SegmentStore, segment_path};
