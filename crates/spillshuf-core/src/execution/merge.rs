//! Phase 2: round-robin merge.
//!
//! Each round reads up to `capacity / K` records from every segment that is
//! not yet drained, in segment order, into one shared buffer. The filled
//! part of the buffer is permuted and appended to the output. A round that
//! reads nothing ends the merge.
//!
//! # Approximation
//!
//! Records only move within a round, and every round draws the same share
//! from each segment. Records that started in the same chunk therefore stay
//! closer together in the output than a perfect shuffle would leave them.
//! Downstream consumers rely on this behaviour; it is not a bug.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use rand::Rng;
use serde::Serialize;
use spillshuf_common::types::Record;
use spillshuf_common::utils::error::{Error, Result};

use super::permute::fisher_yates;
use super::progress::{Phase, ProgressObserver};
use crate::storage::io::RecordWriter;
use crate::storage::segment::SegmentStore;

/// Outcome of the merge phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MergeSummary {
    /// Number of records written to the output.
    pub records: u64,
    /// Number of non-empty rounds.
    pub rounds: u64,
    /// Records drawn from each segment per round.
    pub per_segment: usize,
    /// Number of segment files deleted afterwards.
    pub segments_removed: usize,
}

/// Interleaves segments into the final output.
#[derive(Debug, Clone, Copy)]
pub struct MergeShuffler {
    capacity: usize,
}

impl MergeShuffler {
    /// Creates a merge shuffler with the given buffer capacity, in records.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
        }
    }

    /// Returns how many records each segment contributes per round.
    ///
    /// This is `capacity / segments`, but never less than one: with more
    /// segments than buffer slots the merge buffer grows to one record per
    /// segment rather than stalling.
    #[must_use]
    pub fn per_segment(&self, segments: usize) -> usize {
        if segments == 0 {
            return 0;
        }
        (self.capacity / segments).max(1)
    }

    /// Merges every segment of `store` into a new output file.
    ///
    /// The output is created before any segment is touched, so a failure to
    /// create it leaves the segments intact for a retry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutputCreate`] if the output cannot be created,
    /// [`Error::SegmentOpen`] if a segment cannot be opened, or
    /// [`Error::Io`] if a read or write fails.
    pub fn run<R: Rng + ?Sized>(
        &self,
        store: &mut SegmentStore,
        output: &Path,
        rng: &mut R,
        progress: &dyn ProgressObserver,
    ) -> Result<MergeSummary> {
        let file = File::create(output).map_err(|source| Error::OutputCreate {
            path: output.to_path_buf(),
            source,
        })?;
        tracing::info!(
            output = %output.display(),
            segments = store.len(),
            "Merging temp files"
        );
        self.merge_into(store, BufWriter::new(file), rng, progress)
    }

    /// Merges every segment of `store` into `sink`.
    pub fn merge_into<W: Write, R: Rng + ?Sized>(
        &self,
        store: &mut SegmentStore,
        sink: W,
        rng: &mut R,
        progress: &dyn ProgressObserver,
    ) -> Result<MergeSummary> {
        progress.on_phase_started(Phase::Merge);
        store.open_all()?;

        let segments = store.len();
        let per_segment = self.per_segment(segments);
        let mut buffer: Vec<Record> = Vec::new();
        buffer
            .try_reserve_exact(per_segment * segments)
            .map_err(|_| Error::AllocationExhausted {
                requested: per_segment * segments,
                floor: per_segment * segments,
            })?;

        let mut writer = RecordWriter::new(sink);
        let mut rounds = 0u64;
        loop {
            buffer.clear();
            for index in 0..segments {
                if store.is_drained(index) {
                    continue;
                }
                store.read_batch(index, &mut buffer, per_segment)?;
            }
            if buffer.is_empty() {
                break;
            }

            fisher_yates(&mut buffer, rng);
            writer
                .write_batch(&buffer)
                .map_err(|e| Error::io("writing output", e))?;
            rounds += 1;
            tracing::debug!(
                round = rounds,
                records = writer.records_written(),
                "Merging temp files: processed"
            );
            progress.on_merge_round(rounds, writer.records_written());
        }

        let records = writer.records_written();
        // Everything must reach the output before the segments go away
        let sink = writer.finish().map_err(|e| Error::io("flushing output", e))?;
        let segments_removed = store.remove_drained();
        drop(sink);

        tracing::info!(records, rounds, segments_removed, "Merged temp files");
        progress.on_phase_finished(Phase::Merge, records);

        Ok(MergeSummary {
            records,
            rounds,
            per_segment,
            segments_removed,
        })
    }
}
