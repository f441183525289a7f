//! Shuffle verification command.

use std::path::Path;

use anyhow::{Result, bail};
use comfy_table::{Cell, Color};
use serde::Serialize;
use spillshuf_core::storage::FileDigest;

use crate::OutputFormat;
use crate::output::{self, Format};

/// Verification result output.
#[derive(Serialize)]
struct VerifyOutput {
    same_records: bool,
    expected: FileDigest,
    actual: FileDigest,
}

/// Run the verify command.
pub fn run(expected: &Path, actual: &Path, format: OutputFormat, quiet: bool) -> Result<()> {
    let expected_digest = FileDigest::of_path(expected)?;
    let actual_digest = FileDigest::of_path(actual)?;

    let output = VerifyOutput {
        same_records: expected_digest.same_records(&actual_digest),
        expected: expected_digest,
        actual: actual_digest,
    };

    let fmt: Format = format.into();
    match fmt {
        Format::Json => output::print_json(&output, quiet)?,
        Format::Table => {
            if !quiet {
                let mut table = output::create_table();
                output::add_header(&mut table, &["File", "Records", "Trailing Bytes"]);
                for (path, digest) in [(expected, &output.expected), (actual, &output.actual)] {
                    table.add_row(vec![
                        Cell::new(path.display()).fg(Color::Green),
                        Cell::new(digest.records),
                        Cell::new(digest.trailing_bytes),
                    ]);
                }
                println!("{table}");
            }
        }
    }

    if !output.same_records {
        bail!(
            "{} and {} do not hold the same records",
            expected.display(),
            actual.display()
        );
    }
    output::success("Both files hold the same records", quiet);

    Ok(())
}
