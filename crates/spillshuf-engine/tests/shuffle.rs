//! End-to-end shuffle behaviour.

use std::fs;
use std::path::{Path, PathBuf};

use proptest::prelude::*;
use spillshuf_common::types::{RECORD_SIZE, Record};
use spillshuf_engine::{Error, ShuffleConfig, Shuffler, Verbosity, shuffle};
use tempfile::{TempDir, tempdir};

fn records(n: i32) -> Vec<Record> {
    (0..n)
        .map(|i| Record::new(i, i.wrapping_mul(31), f64::from(i) / 7.0))
        .collect()
}

fn write_records(path: &Path, records: &[Record]) {
    let bytes: Vec<u8> = records.iter().flat_map(|r| r.to_bytes()).collect();
    fs::write(path, bytes).unwrap();
}

/// Raw records of a file, sorted by their bytes.
fn sorted_chunks(bytes: &[u8]) -> Vec<[u8; RECORD_SIZE]> {
    let mut chunks: Vec<[u8; RECORD_SIZE]> = bytes
        .chunks_exact(RECORD_SIZE)
        .map(|c| c.try_into().unwrap())
        .collect();
    chunks.sort_unstable();
    chunks
}

fn leftover_segments(dir: &Path) -> Vec<PathBuf> {
    fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with("shuf.tmp_"))
        })
        .collect()
}

struct Fixture {
    dir: TempDir,
    input: PathBuf,
    output: PathBuf,
}

impl Fixture {
    fn new(records: &[Record]) -> Self {
        let dir = tempdir().unwrap();
        let input = dir.path().join("cooccur.bin");
        let output = dir.path().join("cooccur.shuf.bin");
        write_records(&input, records);
        Self { dir, input, output }
    }

    fn config(&self, capacity: usize, seed: u64) -> ShuffleConfig {
        ShuffleConfig::new(&self.input, &self.output)
            .with_capacity(capacity)
            .with_seed(seed)
    }
}

#[test]
fn test_five_records_capacity_two() {
    let fixture = Fixture::new(&records(5));

    let report = Shuffler::new(fixture.config(2, 17)).run().unwrap();

    assert_eq!(report.segments, 3);
    assert_eq!(report.records, 5);
    let input = fs::read(&fixture.input).unwrap();
    let output = fs::read(&fixture.output).unwrap();
    assert_eq!(sorted_chunks(&input), sorted_chunks(&output));
    assert!(leftover_segments(fixture.dir.path()).is_empty());
}

#[test]
fn test_seeded_runs_are_identical() {
    let fixture = Fixture::new(&records(1000));

    Shuffler::new(fixture.config(64, 2024)).run().unwrap();
    let first = fs::read(&fixture.output).unwrap();
    Shuffler::new(fixture.config(64, 2024)).run().unwrap();
    let second = fs::read(&fixture.output).unwrap();

    assert_eq!(first, second);
    assert_ne!(first, fs::read(&fixture.input).unwrap());
}

#[test]
fn test_different_seeds_differ() {
    let fixture = Fixture::new(&records(1000));

    Shuffler::new(fixture.config(64, 1)).run().unwrap();
    let first = fs::read(&fixture.output).unwrap();
    Shuffler::new(fixture.config(64, 2)).run().unwrap();
    let second = fs::read(&fixture.output).unwrap();

    assert_ne!(first, second);
}

#[test]
fn test_empty_and_single_record_inputs() {
    for n in [0, 1] {
        let fixture = Fixture::new(&records(n));

        let report = Shuffler::new(fixture.config(4, 3)).run().unwrap();

        assert_eq!(report.records, n as u64);
        assert_eq!(report.segments, n as usize);
        assert_eq!(
            fs::read(&fixture.output).unwrap(),
            fs::read(&fixture.input).unwrap()
        );
        assert!(leftover_segments(fixture.dir.path()).is_empty());
    }
}

#[test]
fn test_probed_capacity_run() {
    let fixture = Fixture::new(&records(500));
    // 1 KiB ceiling at 95% gives 60 records per buffer
    let config = ShuffleConfig::new(&fixture.input, &fixture.output)
        .with_memory_limit(1024)
        .with_seed(8);

    let report = Shuffler::new(config).run().unwrap();

    assert_eq!(report.capacity, 60);
    assert_eq!(report.segments, 9);
    assert_eq!(report.records, 500);
}

#[test]
fn test_more_segments_than_capacity() {
    // 50 records at capacity 3 gives 17 segments, more than the buffer holds
    let fixture = Fixture::new(&records(50));

    let report = Shuffler::new(fixture.config(3, 4)).run().unwrap();

    assert_eq!(report.segments, 17);
    assert_eq!(report.per_segment, 1);
    let input = fs::read(&fixture.input).unwrap();
    let output = fs::read(&fixture.output).unwrap();
    assert_eq!(sorted_chunks(&input), sorted_chunks(&output));
}

#[test]
fn test_missing_input_is_input_open_error() {
    let dir = tempdir().unwrap();
    let config = ShuffleConfig::new(dir.path().join("absent.bin"), dir.path().join("out.bin"))
        .with_capacity(4);

    let err = Shuffler::new(config).run().unwrap_err();

    assert!(matches!(err, Error::InputOpen { .. }));
    assert_eq!(err.exit_code(), 2);
    assert!(!dir.path().join("out.bin").exists());
}

#[test]
fn test_uncreatable_output_keeps_segments_for_resume() {
    let fixture = Fixture::new(&records(9));
    let blocked = fixture.dir.path().join("no-such-dir").join("out.bin");
    let config = ShuffleConfig::new(&fixture.input, &blocked)
        .with_temp_prefix(fixture.dir.path().join("shuf.tmp"))
        .with_capacity(4)
        .with_seed(6);

    let err = Shuffler::new(config.clone()).run().unwrap_err();
    assert!(matches!(err, Error::OutputCreate { .. }));
    assert_eq!(leftover_segments(fixture.dir.path()).len(), 3);

    // Point the output somewhere writable and merge what phase 1 left behind
    let mut retry = config;
    retry.output = fixture.output.clone();
    let report = Shuffler::new(retry).resume().unwrap();

    assert_eq!(report.records, 9);
    let input = fs::read(&fixture.input).unwrap();
    let output = fs::read(&fixture.output).unwrap();
    assert_eq!(sorted_chunks(&input), sorted_chunks(&output));
    assert!(leftover_segments(fixture.dir.path()).is_empty());
}

#[test]
fn test_resume_refuses_partial_segment_set() {
    let fixture = Fixture::new(&records(9));
    let blocked = fixture.dir.path().join("no-such-dir").join("out.bin");
    let prefix = fixture.dir.path().join("shuf.tmp");
    let config = ShuffleConfig::new(&fixture.input, &blocked)
        .with_temp_prefix(&prefix)
        .with_capacity(4)
        .with_seed(2);
    Shuffler::new(config.clone()).run().unwrap_err();

    // Only the first segment (4 of 9 records) survives
    fs::remove_file(spillshuf_core::storage::segment_path(&prefix, 1)).unwrap();
    let mut retry = config;
    retry.output = fixture.output.clone();
    let err = Shuffler::new(retry).resume().unwrap_err();

    assert!(matches!(
        err,
        Error::IncompleteSegments {
            expected: 9,
            found: 4,
            ..
        }
    ));
    assert_eq!(err.exit_code(), 8);
    assert!(!fixture.output.exists());
    assert!(spillshuf_core::storage::segment_path(&prefix, 0).exists());
}

#[test]
fn test_resume_with_wrong_prefix_leaves_output_alone() {
    let fixture = Fixture::new(&records(9));
    Shuffler::new(fixture.config(4, 3)).run().unwrap();
    let finished = fs::read(&fixture.output).unwrap();

    let config = fixture
        .config(4, 3)
        .with_temp_prefix(fixture.dir.path().join("typo"));
    let err = Shuffler::new(config).resume().unwrap_err();

    assert!(matches!(err, Error::SegmentOpen { .. }));
    assert_eq!(err.exit_code(), 3);
    assert_eq!(fs::read(&fixture.output).unwrap(), finished);
}

#[test]
fn test_uncreatable_segment_aborts_run() {
    let fixture = Fixture::new(&records(9));
    let config = fixture
        .config(4, 1)
        .with_temp_prefix(fixture.dir.path().join("gone").join("shuf.tmp"));

    let err = Shuffler::new(config).run().unwrap_err();

    assert!(matches!(err, Error::SegmentCreate { .. }));
    assert!(!fixture.output.exists());
}

#[test]
fn test_shuffle_entry_point_logs_to_file() {
    let fixture = Fixture::new(&records(2000));
    let log = fixture.dir.path().join("shuffle.log");
    let prefix = fixture.dir.path().join("shuf.tmp");

    // 16 KiB ceiling keeps several segments in play
    let report = shuffle(
        &fixture.input,
        &fixture.output,
        &prefix,
        Verbosity::High,
        16.0 / (1024.0 * 1024.0),
        Some(&log),
    )
    .unwrap();

    assert_eq!(report.records, 2000);
    assert!(report.segments > 1);
    let text = fs::read_to_string(&log).unwrap();
    assert!(text.contains("Shuffling by chunks"));
    assert!(text.contains("Merging temp files"));
    assert!(leftover_segments(fixture.dir.path()).is_empty());
}

#[test]
fn test_merge_keeps_chunk_locality() {
    // Every merge round takes capacity / K records from each segment, so the
    // first round of output only holds records from the first share of each
    // chunk. A perfect shuffle would not guarantee this.
    let n = 4000;
    let capacity = 1000;
    let fixture = Fixture::new(&records(n));

    let report = Shuffler::new(fixture.config(capacity, 77)).run().unwrap();
    assert_eq!(report.segments, 4);
    assert_eq!(report.per_segment, 250);

    let output = fs::read(&fixture.output).unwrap();
    let first_round: Vec<Record> = output[..capacity * RECORD_SIZE]
        .chunks_exact(RECORD_SIZE)
        .map(|c| Record::from_bytes(c.try_into().unwrap()))
        .collect();
    let per_chunk = first_round.iter().fold([0usize; 4], |mut acc, r| {
        acc[(r.word1 / 1000) as usize] += 1;
        acc
    });
    assert_eq!(per_chunk, [250; 4]);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_output_is_a_permutation_of_input(
        n in 0i32..400,
        capacity in 1usize..64,
        seed in any::<u64>(),
    ) {
        let fixture = Fixture::new(&records(n));

        let report = Shuffler::new(fixture.config(capacity, seed)).run().unwrap();

        prop_assert_eq!(report.segments, (n as usize).div_ceil(capacity));
        let input = fs::read(&fixture.input).unwrap();
        let output = fs::read(&fixture.output).unwrap();
        prop_assert_eq!(sorted_chunks(&input), sorted_chunks(&output));
        prop_assert!(leftover_segments(fixture.dir.path()).is_empty());
    }
}
