//! Storage for record streams.
//!
//! - [`io`] - Buffered record readers and writers over any byte stream
//! - [`segment`] - Temporary segment files written by the chunk phase
//! - [`digest`] - Order-independent file fingerprints

pub mod digest;
pub mod io;
pub mod segment;

pub use digest::FileDigest;
pub use io::{RecordReader, RecordWriter};
pub use segment::{SegmentStore, segment_path};
