//! Phase 1: chunk permutation.
//!
//! Streams the input into a buffer of `capacity` records. Every time the
//! buffer fills up it is permuted in place and written out as one segment,
//! then reused. A final partial buffer becomes the last segment, so an input
//! of `N` records yields `ceil(N / capacity)` segments.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use rand::Rng;
use serde::Serialize;
use spillshuf_common::types::Record;
use spillshuf_common::utils::error::{Error, Result};

use super::permute::fisher_yates;
use super::progress::{Phase, ProgressObserver};
use crate::storage::io::RecordReader;
use crate::storage::segment::SegmentStore;

/// Outcome of the chunk phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChunkSummary {
    /// Number of segments written.
    pub segments: usize,
    /// Number of records read from the input.
    pub records: u64,
    /// Size of a trailing partial record that was dropped, in bytes.
    pub trailing_bytes: usize,
}

/// Permutes capacity-sized chunks of the input into segment files.
#[derive(Debug, Clone, Copy)]
pub struct ChunkShuffler {
    capacity: usize,
}

impl ChunkShuffler {
    /// Creates a chunk shuffler with the given buffer capacity, in records.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
        }
    }

    /// Returns the buffer capacity, in records.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Shuffles the input file into segments of `store`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InputOpen`] if the input cannot be opened,
    /// [`Error::SegmentCreate`] if a segment cannot be created, or
    /// [`Error::Io`] if a read or write fails. Segments written before the
    /// failure stay on disk.
    pub fn run<R: Rng + ?Sized>(
        &self,
        input: &Path,
        store: &mut SegmentStore,
        rng: &mut R,
        progress: &dyn ProgressObserver,
    ) -> Result<ChunkSummary> {
        let file = File::open(input).map_err(|source| Error::InputOpen {
            path: input.to_path_buf(),
            source,
        })?;
        tracing::info!(
            input = %input.display(),
            capacity = self.capacity,
            "Shuffling by chunks"
        );
        self.shuffle_stream(BufReader::new(file), store, rng, progress)
    }

    /// Shuffles an already opened record stream into segments of `store`.
    pub fn shuffle_stream<S: Read, R: Rng + ?Sized>(
        &self,
        stream: S,
        store: &mut SegmentStore,
        rng: &mut R,
        progress: &dyn ProgressObserver,
    ) -> Result<ChunkSummary> {
        progress.on_phase_started(Phase::Chunk);

        let mut buffer: Vec<Record> = Vec::new();
        buffer
            .try_reserve_exact(self.capacity)
            .map_err(|_| Error::AllocationExhausted {
                requested: self.capacity,
                floor: self.capacity,
            })?;

        let mut reader = RecordReader::new(stream);
        let mut records = 0u64;
        loop {
            if buffer.len() >= self.capacity {
                records += buffer.len() as u64;
                self.flush(&mut buffer, store, rng, records, progress)?;
            }
            match reader
                .read_record()
                .map_err(|e| Error::io("reading input", e))?
            {
                Some(record) => buffer.push(record),
                None => break,
            }
        }
        if !buffer.is_empty() {
            records += buffer.len() as u64;
            self.flush(&mut buffer, store, rng, records, progress)?;
        }

        let trailing_bytes = reader.trailing_bytes();
        if trailing_bytes > 0 {
            tracing::warn!(trailing_bytes, "Input ends in a partial record, ignoring it");
        }
        tracing::info!(
            records,
            segments = store.len(),
            "Wrote temporary segment file(s)"
        );
        progress.on_phase_finished(Phase::Chunk, records);

        Ok(ChunkSummary {
            segments: store.len(),
            records,
            trailing_bytes,
        })
    }

    fn flush<R: Rng + ?Sized>(
        &self,
        buffer: &mut Vec<Record>,
        store: &mut SegmentStore,
        rng: &mut R,
        records: u64,
        progress: &dyn ProgressObserver,
    ) -> Result<()> {
        fisher_yates(buffer, rng);
        let index = store.write_segment(buffer)?;
        buffer.clear();
        tracing::debug!(segment = index, records, "Shuffling by chunks: processed");
        progress.on_chunk_written(index, records);
        Ok(())
    }
}
