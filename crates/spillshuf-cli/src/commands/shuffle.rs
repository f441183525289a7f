//! Shuffle command.

use anyhow::Result;
use spillshuf_common::RECORD_SIZE;
use spillshuf_core::storage::SegmentStore;
use spillshuf_engine::{ShuffleConfig, ShuffleReport, Shuffler};

use crate::output::{self, Format};
use crate::progress::TerminalProgress;
use crate::{OutputFormat, ShuffleArgs};

/// Run the shuffle command.
pub fn run(args: ShuffleArgs, format: OutputFormat, quiet: bool) -> Result<()> {
    let mut config =
        ShuffleConfig::new(&args.input, &args.output).with_memory_limit_gb(args.memory_gb);
    if let Some(prefix) = &args.temp_prefix {
        config = config.with_temp_prefix(prefix);
    }
    if let Some(capacity) = args.capacity {
        config = config.with_capacity(capacity);
    }
    if let Some(seed) = args.seed {
        config = config.with_seed(seed);
    }

    let fmt: Format = format.into();
    let total = progress_total(&args, &config);
    let mut shuffler = Shuffler::new(config);
    if shows_progress(fmt, quiet) {
        shuffler = shuffler.with_progress(TerminalProgress::new(total));
    }

    let report = if args.resume {
        output::status("Merging leftover segments...", quiet);
        shuffler.resume()?
    } else {
        shuffler.run()?
    };

    match fmt {
        Format::Json => output::print_json(&report, quiet)?,
        Format::Table => print_report(&report, quiet),
    }
    output::success("Shuffle completed", quiet);

    Ok(())
}

/// The bar shares stderr with the log, so it is only drawn for table output.
fn shows_progress(format: Format, quiet: bool) -> bool {
    !quiet && matches!(format, Format::Table)
}

/// Records the progress bar counts toward.
fn progress_total(args: &ShuffleArgs, config: &ShuffleConfig) -> u64 {
    // Missing files are reported by the shuffle itself
    if args.resume {
        SegmentStore::recover(config.temp_prefix()).map_or(0, |store| store.total_records())
    } else {
        std::fs::metadata(&args.input).map_or(0, |m| m.len() / RECORD_SIZE as u64)
    }
}

fn print_report(report: &ShuffleReport, quiet: bool) {
    let mut items = vec![
        ("Records", report.records.to_string()),
        ("Capacity", report.capacity.to_string()),
        ("Segments", report.segments.to_string()),
        ("Merge Rounds", report.merge_rounds.to_string()),
        ("Per Segment", report.per_segment.to_string()),
        ("Elapsed", format!("{} ms", report.elapsed_ms)),
    ];
    if report.capacity < report.initial_capacity {
        items.push(("Initial Capacity", report.initial_capacity.to_string()));
    }
    if report.trailing_bytes > 0 {
        items.push(("Dropped Bytes", report.trailing_bytes.to_string()));
    }
    output::print_key_value_table(&items, quiet);
}

#[cfg(test)]
mod tests {
    use super::*;
    use spillshuf_common::Record;
    use std::path::Path;
    use tempfile::tempdir;

    fn args(input: &Path, output: &Path, resume: bool) -> ShuffleArgs {
        ShuffleArgs {
            input: input.to_path_buf(),
            output: output.to_path_buf(),
            temp_prefix: None,
            memory_gb: 2.0,
            capacity: None,
            seed: None,
            log_file: None,
            resume,
        }
    }

    #[test]
    fn test_progress_only_for_table_output() {
        assert!(shows_progress(Format::Table, false));
        assert!(!shows_progress(Format::Json, false));
        assert!(!shows_progress(Format::Table, true));
    }

    #[test]
    fn test_progress_total_counts_input_records() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("in.bin");
        let output = dir.path().join("out.bin");
        std::fs::write(&input, [0u8; 3 * RECORD_SIZE + 5]).unwrap();
        let config = ShuffleConfig::new(&input, &output);

        assert_eq!(progress_total(&args(&input, &output, false), &config), 3);
    }

    #[test]
    fn test_progress_total_on_resume_counts_segments() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("gone.bin");
        let output = dir.path().join("out.bin");
        let prefix = dir.path().join("shuf");
        let mut store = SegmentStore::new(&prefix);
        store.write_segment(&[Record::new(1, 2, 3.0); 4]).unwrap();
        store.write_segment(&[Record::new(4, 5, 6.0); 2]).unwrap();
        let config = ShuffleConfig::new(&input, &output).with_temp_prefix(&prefix);

        assert_eq!(progress_total(&args(&input, &output, true), &config), 6);
    }
}
