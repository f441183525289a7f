//! The shuffle orchestrator.
//!
//! [`Shuffler::run`] sequences the three steps of a shuffle and stops at the
//! first failure:
//!
//! 1. budget the record buffer ([`MemoryBudgeter`])
//! 2. permute the input into segments ([`ChunkShuffler`])
//! 3. merge the segments into the output ([`MergeShuffler`])
//!
//! One random generator drives both phases. With
//! [`ShuffleConfig::with_seed`] and a fixed capacity, the output is
//! byte-for-byte reproducible.

use std::fs;
use std::io;
use std::time::Instant;

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;
use spillshuf_common::memory::{AllocationProbe, Budget, HeapProbe, MemoryBudgeter};
use spillshuf_common::types::RECORD_SIZE;
use spillshuf_common::utils::error::{Error, Result};
use spillshuf_core::execution::{ChunkShuffler, MergeShuffler, NoopProgress, ProgressObserver};
use spillshuf_core::storage::{SegmentStore, segment_path};

use crate::config::ShuffleConfig;

/// Summary of a completed shuffle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShuffleReport {
    /// Number of records shuffled.
    pub records: u64,
    /// Buffer capacity used by both phases, in records.
    pub capacity: usize,
    /// Capacity the memory probe started from, in records.
    pub initial_capacity: usize,
    /// Number of segment files written (or recovered).
    pub segments: usize,
    /// Number of merge rounds.
    pub merge_rounds: u64,
    /// Records drawn from each segment per merge round.
    pub per_segment: usize,
    /// Size of a dropped trailing partial record, in bytes.
    pub trailing_bytes: usize,
    /// Wall-clock duration of the run, in milliseconds.
    pub elapsed_ms: u64,
}

/// Runs shuffles described by a [`ShuffleConfig`].
pub struct Shuffler {
    config: ShuffleConfig,
    probe: Box<dyn AllocationProbe>,
    progress: Box<dyn ProgressObserver>,
}

impl Shuffler {
    /// Creates a shuffler that probes the heap and reports no progress.
    #[must_use]
    pub fn new(config: ShuffleConfig) -> Self {
        Self {
            config,
            probe: Box::new(HeapProbe),
            progress: Box::new(NoopProgress),
        }
    }

    /// Replaces the allocation probe used for budgeting.
    pub fn with_probe(mut self, probe: impl AllocationProbe + 'static) -> Self {
        self.probe = Box::new(probe);
        self
    }

    /// Sets the progress observer.
    pub fn with_progress(mut self, progress: impl ProgressObserver + 'static) -> Self {
        self.progress = Box::new(progress);
        self
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &ShuffleConfig {
        &self.config
    }

    /// Computes the buffer capacity for this run.
    ///
    /// A fixed capacity from the configuration skips the probe.
    pub fn budget(&self) -> Result<Budget> {
        if let Some(capacity) = self.config.capacity {
            return Ok(Budget::fixed(capacity));
        }
        MemoryBudgeter::new(self.config.memory_limit)
            .with_fraction(self.config.safety_fraction)
            .with_min_capacity(self.config.min_capacity)
            .budget_with(self.probe.as_ref())
    }

    /// Shuffles the input into the output.
    ///
    /// # Errors
    ///
    /// Returns the first error of any step; later steps are not attempted.
    /// Segments written before a failure are left on disk.
    pub fn run(&self) -> Result<ShuffleReport> {
        let started = Instant::now();
        self.config.validate()?;

        let budget = self.budget()?;
        let mut rng = self.rng();
        let mut store = SegmentStore::new(self.config.temp_prefix());

        let chunks = ChunkShuffler::new(budget.capacity).run(
            &self.config.input,
            &mut store,
            &mut rng,
            self.progress.as_ref(),
        )?;
        let merged = MergeShuffler::new(budget.capacity).run(
            &mut store,
            &self.config.output,
            &mut rng,
            self.progress.as_ref(),
        )?;

        Ok(ShuffleReport {
            records: merged.records,
            capacity: budget.capacity,
            initial_capacity: budget.initial,
            segments: chunks.segments,
            merge_rounds: merged.rounds,
            per_segment: merged.per_segment,
            trailing_bytes: chunks.trailing_bytes,
            elapsed_ms: started.elapsed().as_millis() as u64,
        })
    }

    /// Merges segment files left behind by an interrupted run.
    ///
    /// Skips the chunk phase and merges the segments under the configured
    /// prefix into the output. When the input is still readable, the
    /// segments must hold exactly as many records as it does.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SegmentOpen`] for the first segment path if no
    /// segments exist, [`Error::IncompleteSegments`] if they disagree with
    /// the input, or the first error of budgeting or merging. The output is
    /// not touched and the segments are kept unless merging starts.
    pub fn resume(&self) -> Result<ShuffleReport> {
        let started = Instant::now();
        self.config.validate()?;

        let budget = self.budget()?;
        let mut rng = self.rng();
        let mut store = SegmentStore::recover(self.config.temp_prefix())?;
        self.check_recovered(&store)?;
        let segments = store.len();

        let merged = MergeShuffler::new(budget.capacity).run(
            &mut store,
            &self.config.output,
            &mut rng,
            self.progress.as_ref(),
        )?;

        Ok(ShuffleReport {
            records: merged.records,
            capacity: budget.capacity,
            initial_capacity: budget.initial,
            segments,
            merge_rounds: merged.rounds,
            per_segment: merged.per_segment,
            trailing_bytes: 0,
            elapsed_ms: started.elapsed().as_millis() as u64,
        })
    }

    fn check_recovered(&self, store: &SegmentStore) -> Result<()> {
        if store.is_empty() {
            return Err(Error::SegmentOpen {
                path: segment_path(store.prefix(), 0),
                source: io::Error::new(io::ErrorKind::NotFound, "no segments to resume from"),
            });
        }

        let found = store.total_records();
        match fs::metadata(&self.config.input) {
            Ok(metadata) => {
                let expected = metadata.len() / RECORD_SIZE as u64;
                if found != expected {
                    return Err(Error::IncompleteSegments {
                        prefix: store.prefix().to_path_buf(),
                        expected,
                        found,
                    });
                }
            }
            Err(e) => {
                tracing::warn!(
                    input = %self.config.input.display(),
                    error = %e,
                    records = found,
                    "Input unavailable, merging recovered segments unchecked"
                );
            }
        }
        Ok(())
    }

    fn rng(&self) -> StdRng {
        match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spillshuf_common::types::Record;
    use tempfile::tempdir;

    fn write_input(path: &std::path::Path, n: i32) {
        let bytes: Vec<u8> = (0..n)
            .flat_map(|i| Record::new(i, i + 1, f64::from(i)).to_bytes())
            .collect();
        std::fs::write(path, bytes).unwrap();
    }

    #[test]
    fn test_fixed_capacity_skips_probe() {
        let config = ShuffleConfig::new("a", "b").with_capacity(7);
        let shuffler = Shuffler::new(config).with_probe(|_: usize| false);

        assert_eq!(shuffler.budget().unwrap(), Budget::fixed(7));
    }

    #[test]
    fn test_probe_threshold_bounds_capacity() {
        let config = ShuffleConfig::new("a", "b").with_memory_limit(1 << 20);
        let shuffler = Shuffler::new(config).with_probe(|records: usize| records <= 1000);

        let budget = shuffler.budget().unwrap();
        assert!(budget.capacity <= 1000);
        assert!(budget.was_reduced());
    }

    #[test]
    fn test_exhausted_probe_stops_before_io() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("in.bin");
        write_input(&input, 4);
        let config = ShuffleConfig::new(&input, dir.path().join("out.bin"));

        let err = Shuffler::new(config)
            .with_probe(|_: usize| false)
            .run()
            .unwrap_err();

        assert!(matches!(err, Error::AllocationExhausted { .. }));
        assert!(!dir.path().join("out.bin").exists());
    }

    #[test]
    fn test_run_reports_counts() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("in.bin");
        write_input(&input, 10);
        let config = ShuffleConfig::new(&input, dir.path().join("out.bin"))
            .with_capacity(4)
            .with_seed(5);

        let report = Shuffler::new(config).run().unwrap();

        assert_eq!(report.records, 10);
        assert_eq!(report.capacity, 4);
        assert_eq!(report.segments, 3);
        // 4 / 3 segments = 1 record per segment per round
        assert_eq!(report.per_segment, 1);
        assert_eq!(report.merge_rounds, 4);
    }

    #[test]
    fn test_resume_merges_leftover_segments() {
        let dir = tempdir().unwrap();
        let prefix = dir.path().join("shuf");
        {
            let mut store = SegmentStore::new(&prefix);
            let records: Vec<Record> = (0..6).map(|i| Record::new(i, 0, 0.0)).collect();
            store.write_segment(&records[0..3]).unwrap();
            store.write_segment(&records[3..6]).unwrap();
        }
        let config = ShuffleConfig::new(dir.path().join("in.bin"), dir.path().join("out.bin"))
            .with_temp_prefix(&prefix)
            .with_capacity(4)
            .with_seed(1);

        let report = Shuffler::new(config).resume().unwrap();

        assert_eq!(report.segments, 2);
        assert_eq!(report.records, 6);
        assert!(!segment_path(&prefix, 0).exists());
    }

    #[test]
    fn test_resume_without_segments_keeps_output() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("out.bin");
        std::fs::write(&output, [7u8; 32]).unwrap();
        let config = ShuffleConfig::new(dir.path().join("in.bin"), &output)
            .with_temp_prefix(dir.path().join("typo"))
            .with_capacity(4);

        let err = Shuffler::new(config).resume().unwrap_err();

        match err {
            Error::SegmentOpen { path, .. } => assert!(path.ends_with("typo_0000.bin")),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(std::fs::read(&output).unwrap(), vec![7u8; 32]);
    }

    #[test]
    fn test_resume_rejects_short_segments() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("in.bin");
        let prefix = dir.path().join("shuf");
        write_input(&input, 5);
        let mut store = SegmentStore::new(&prefix);
        store.write_segment(&[Record::new(0, 1, 0.0)]).unwrap();
        let config = ShuffleConfig::new(&input, dir.path().join("out.bin"))
            .with_temp_prefix(&prefix)
            .with_capacity(4);

        let err = Shuffler::new(config).resume().unwrap_err();

        assert!(matches!(
            err,
            Error::IncompleteSegments {
                expected: 5,
                found: 1,
                ..
            }
        ));
        assert!(segment_path(&prefix, 0).exists());
        assert!(!dir.path().join("out.bin").exists());
    }
}
